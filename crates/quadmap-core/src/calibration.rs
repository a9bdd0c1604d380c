use std::fmt;

/// Whether control points are shown and editable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CalibrationMode {
    Idle,
    #[default]
    Calibrating,
}

impl CalibrationMode {
    #[inline]
    pub fn is_calibrating(self) -> bool {
        self == CalibrationMode::Calibrating
    }

    pub fn toggle(&mut self) {
        *self = self.toggled();
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            CalibrationMode::Idle => CalibrationMode::Calibrating,
            CalibrationMode::Calibrating => CalibrationMode::Idle,
        }
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationMode::Idle => f.write_str("idle"),
            CalibrationMode::Calibrating => f.write_str("calibrating"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_calibrating_and_toggles() {
        let m = CalibrationMode::default();
        assert!(m.is_calibrating());
        assert_eq!(m.toggled(), CalibrationMode::Idle);
        assert_eq!(m.toggled().toggled(), m);

        let mut m = m;
        m.toggle();
        assert_eq!(m, CalibrationMode::Idle);
    }
}
