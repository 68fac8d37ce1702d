//! Render modes for sculpture surfaces.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SculptError};

/// How a surface is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    Points,
    Wireframe,
    #[default]
    Solid,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [Self::Points, Self::Wireframe, Self::Solid];

    /// Next mode in the POINTS -> WIREFRAME -> SOLID cycle
    pub fn next(self) -> Self {
        match self {
            Self::Points => Self::Wireframe,
            Self::Wireframe => Self::Solid,
            Self::Solid => Self::Points,
        }
    }

    /// Identifier used for parameters and config files
    pub fn key(self) -> &'static str {
        match self {
            Self::Points => "POINTS",
            Self::Wireframe => "WIREFRAME",
            Self::Solid => "SOLID",
        }
    }

    /// Whether normals and lighting take part in drawing
    pub fn is_lit(self) -> bool {
        self == Self::Solid
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Points => "Points",
            Self::Wireframe => "Wireframe",
            Self::Solid => "Solid",
        };
        f.write_str(name)
    }
}

impl FromStr for RenderMode {
    type Err = SculptError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SculptError::invalid(format!("unknown render mode '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mode_cycle() {
        let mut mode = RenderMode::default();
        assert_eq!(mode, RenderMode::Solid);

        mode = mode.next();
        assert_eq!(mode, RenderMode::Points);
        mode = mode.next();
        assert_eq!(mode, RenderMode::Wireframe);
        mode = mode.next();
        assert_eq!(mode, RenderMode::Solid);
    }

    #[test]
    fn test_render_mode_parse() {
        assert_eq!("wireframe".parse::<RenderMode>().unwrap(), RenderMode::Wireframe);
        assert_eq!(" POINTS ".parse::<RenderMode>().unwrap(), RenderMode::Points);
        assert!(matches!(
            "shaded".parse::<RenderMode>(),
            Err(SculptError::InvalidArgument(_))
        ));
    }
}
