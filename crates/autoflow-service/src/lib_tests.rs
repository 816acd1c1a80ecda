//! Tests for the CLI surface and state assembly.

use super::*;
use clap::Parser;

mod cli_tests {
    use super::*;

    /// Bare invocation parses with no subcommand (implying `serve`).
    #[test]
    fn test_bare_invocation_parses() {
        let cli = Cli::try_parse_from(["autoflow"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.json_logs);
    }

    /// Serve accepts host and port overrides.
    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from([
            "autoflow",
            "--log-level",
            "debug",
            "serve",
            "--port",
            "9090",
            "--host",
            "127.0.0.1",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Some(Commands::Serve { port, host }) => {
                assert_eq!(port, Some(9090));
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
            }
            other => panic!("expected serve command, got {:?}", other),
        }
    }

    /// The config subcommand accepts the show flag.
    #[test]
    fn test_config_show() {
        let cli = Cli::try_parse_from(["autoflow", "config", "--show"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Config { show: true })));
    }

    /// An unknown subcommand is rejected.
    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["autoflow", "teleport"]).is_err());
    }
}

mod build_state_tests {
    use super::*;

    /// A default configuration assembles into working state, with both
    /// trigger paths wired (as unconfigured placeholders).
    #[test]
    fn test_default_config_builds() {
        let state = build_state(ServiceConfig::default()).unwrap();
        assert_eq!(state.config.server.port, 8080);
    }

    /// A fully configured trigger section builds the production clients.
    #[test]
    fn test_configured_triggers_build() {
        let mut service_config = ServiceConfig::default();
        service_config.webhooks.secret = Some("hook-secret".to_string());
        service_config.triggers.vercel_deploy_hook_url =
            Some("https://api.vercel.com/v1/integrations/deploy/prj_x/abc".to_string());
        service_config.triggers.github_token = Some("ghp_token".to_string());
        service_config.triggers.callback_url =
            Some("https://autoflow.example.com/api/webhooks/deployment".to_string());

        assert!(build_state(service_config).is_ok());
    }

    /// An unparseable deploy-hook URL is a configuration error.
    #[test]
    fn test_invalid_hook_url_rejected() {
        let mut service_config = ServiceConfig::default();
        service_config.triggers.vercel_deploy_hook_url = Some("not a url".to_string());

        let result = build_state(service_config);
        assert!(matches!(result, Err(CliError::Configuration(_))));
    }
}
