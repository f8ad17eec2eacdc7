//! Command-line argument groups shared by the programs

use clap::Args;
use isoviz_visualization::ViewerConfig;

/// Initial clip plane offsets
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ClipArgs {
    /// Initial X, Y and Z clip plane offsets
    #[arg(
        long,
        num_args = 3,
        value_names = ["X", "Y", "Z"],
        allow_negative_numbers = true
    )]
    pub clip: Option<Vec<f32>>,
}

impl ClipArgs {
    /// Offsets per axis, zero when `--clip` was not given
    pub fn offsets(&self) -> [f32; 3] {
        match self.clip.as_deref() {
            Some([x, y, z]) => [*x, *y, *z],
            _ => [0.0; 3],
        }
    }
}

/// Window options
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ViewerArgs {
    /// Window width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,
}

impl ViewerArgs {
    pub fn config(&self, title: &str) -> ViewerConfig {
        ViewerConfig {
            width: self.width.max(1),
            height: self.height.max(1),
            ..ViewerConfig::default().with_title(title)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        clip: ClipArgs,
        #[command(flatten)]
        viewer: ViewerArgs,
    }

    #[test]
    fn test_clip_defaults_to_zero() {
        let cli = TestCli::try_parse_from(["test"]).unwrap();
        assert_eq!(cli.clip.offsets(), [0.0; 3]);
        assert_eq!((cli.viewer.width, cli.viewer.height), (800, 600));
    }

    #[test]
    fn test_clip_takes_three_values() {
        let cli = TestCli::try_parse_from(["test", "--clip", "10", "-2", "3.5"]).unwrap();
        assert_eq!(cli.clip.offsets(), [10.0, -2.0, 3.5]);

        assert!(TestCli::try_parse_from(["test", "--clip", "1", "2"]).is_err());
    }

    #[test]
    fn test_viewer_config() {
        let cli = TestCli::try_parse_from(["test", "--width", "1024", "--height", "768"]).unwrap();
        let config = cli.viewer.config("isogm");
        assert_eq!(config.title, "isogm");
        assert_eq!((config.width, config.height), (1024, 768));
        assert_eq!(config.background, [0.25; 3]);
    }
}
