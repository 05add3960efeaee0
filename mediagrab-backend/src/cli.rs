/// Command-line arguments. The binary takes exactly one option (the config
/// file path), so arguments are picked out of `std::env::args` directly.
pub struct CliArgs {
    pub config_path: Option<String>,
    pub help_requested: bool,
}

impl CliArgs {
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            config_path: Self::extract_config_path(&args),
            help_requested: args.iter().any(|a| a == "--help" || a == "-h"),
        }
    }

    pub fn print_help() {
        eprintln!(
            "Usage: mediagrab-backend [--config-path PATH] [--help]\n\n\
             --config-path, -c    Path to configuration file (overrides MEDIAGRAB_CONFIG_PATH env var)"
        );
    }

    /// Accepts `--config-path PATH`, `--config-path=PATH`, `-c PATH` and
    /// `-c=PATH`. A flag with no following value yields `None`.
    fn extract_config_path(args: &[String]) -> Option<String> {
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            if let Some(value) = arg
                .strip_prefix("--config-path=")
                .or_else(|| arg.strip_prefix("-c="))
            {
                return Some(value.to_string());
            }
            if arg == "--config-path" || arg == "-c" {
                return iter.next().cloned();
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::CliArgs;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("mediagrab-backend".to_string())
            .chain(list.iter().map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn extracts_config_path_forms() {
        assert_eq!(
            CliArgs::extract_config_path(&args(&["--config-path", "/etc/mg.toml"])),
            Some("/etc/mg.toml".to_string())
        );
        assert_eq!(
            CliArgs::extract_config_path(&args(&["--config-path=/etc/mg.toml"])),
            Some("/etc/mg.toml".to_string())
        );
        assert_eq!(
            CliArgs::extract_config_path(&args(&["-c", "cfg.yaml"])),
            Some("cfg.yaml".to_string())
        );
        assert_eq!(
            CliArgs::extract_config_path(&args(&["-c=cfg.yaml"])),
            Some("cfg.yaml".to_string())
        );
        assert_eq!(CliArgs::extract_config_path(&args(&["--config-path"])), None);
        assert_eq!(CliArgs::extract_config_path(&args(&[])), None);
    }
}
