use clap::{arg, command, value_parser, ArgMatches};
use schematic::{Config, ConfigLoader};
use std::{collections::HashMap, env, path::PathBuf};

const CONFIGS: &[&str] = &[
    "exoproof.json",
    "exoproof.yml",
    "exoproof.yaml",
    "exoproof.toml",
];

#[cfg(test)]
pub const DEFAULT_BASE_URL: &str = "https://try.exosphere.app/exosphere";
pub const DEFAULT_LOCAL_STORAGE_DIR: &str = "/tmp";

pub fn configure() -> ExoproofContext {
    let cli_matches = get_cli_matches();

    let configs: Vec<&str> = CONFIGS
        .iter()
        .filter(|c| std::path::Path::new(c).exists())
        .cloned()
        .collect();
    if configs.len() > 1 {
        eprintln!(
            "Found multiple possible config files: [{}]",
            configs.join(", ")
        );
        eprintln!("Exoproof only supports loading one configuration file format, please ensure only one file exists.");
        std::process::exit(1);
    }

    let mut loader = ConfigLoader::<ExoproofParams>::new();
    for config in configs {
        if let Err(e) = loader.file(config) {
            eprintln!("Failed to load {config}:\n{e}");
            std::process::exit(1);
        }
    }

    match loader.load() {
        Err(e) => {
            eprintln!("Failed to initialize configuration: {e}");
            std::process::exit(1);
        }
        Ok(mut result) => {
            if let Err(e) = result.config.override_from_cli(cli_matches) {
                eprintln!("{e}");
                std::process::exit(1);
            }

            match ExoproofContext::load(result.config) {
                Ok(ctx) => ctx,
                Err(e) => {
                    eprintln!("Failed to initialize configuration: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

fn get_cli_matches() -> ArgMatches {
    command!()
        .arg(
            arg!(
                -r --root <DIR> "The location from which to look for exoproof scenario files"
            )
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(
                --"base-url" <URL> "The Exosphere deployment to run scenarios against"
            )
            .required(false),
        )
        .arg(
            arg!(--placeholders <PAIRS> "Define placeholders for scenarios")
                .long_help("e.g. --placeholders key=value second_key=second_value")
                .required(false)
                .num_args(0..),
        )
        .arg(
            arg!(--"placeholder-delimiter" <DELIM> "Define which character delimits placeholders for scenario steps")
                .required(false)
        )
        .arg(
            arg!(
                -v --verbose ... "Print each step as it runs"
            )
            .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(
                --porcelain ... "Reduce logging to be stable"
            )
            .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(
                --headed ... "Show the browser window while scenarios run"
            )
            .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(
                --timeout <NUM> "How long in seconds to wait for elements to appear"
            )
            .required(false)
            .value_parser(value_parser!(u64)),
        )
        .arg(
            arg!(
                -n --name <NAME> "Exact name of a scenario to run")
                .long_help("case-sensitive")
                .required(false)
        )
        .arg(
            arg!(
                --"local-storage-dir" <DIR> "Where saved local storage items are kept between scenarios"
            )
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        )
        .get_matches()
}

#[derive(Config, Debug, Clone)]
#[config(rename_all = "snake_case")]
pub struct ExoproofParams {
    /// The location from which to look for exoproof scenario files
    #[setting(env = "EXOPROOF_ROOT")]
    pub root: Option<PathBuf>,

    /// The Exosphere deployment that "I go to Exosphere" navigates to
    #[setting(env = "EXOSPHERE_BASE_URL")]
    #[setting(default = "https://try.exosphere.app/exosphere")]
    pub base_url: String,

    /// Username entered by "I enter TACC credentials"
    #[setting(env = "taccusername")]
    pub tacc_username: Option<String>,

    /// Password entered by "I enter TACC credentials"
    #[setting(env = "taccpass")]
    pub tacc_password: Option<String>,

    /// Directory holding saved local storage items
    #[setting(env = "EXOPROOF_LOCAL_STORAGE_DIR")]
    pub local_storage_dir: Option<PathBuf>,

    /// Print each step as it runs
    #[setting(env = "EXOPROOF_VERBOSE")]
    pub verbose: bool,

    /// Reduce logging to be stable
    #[setting(env = "EXOPROOF_PORCELAIN")]
    pub porcelain: bool,

    /// Show the browser window while scenarios run
    #[setting(env = "EXOPROOF_HEADED")]
    pub headed: bool,

    /// Run a specific scenario
    #[setting(env = "EXOPROOF_RUN_NAME")]
    pub run_name: Option<String>,

    /// How long in seconds to wait for elements to appear
    #[setting(env = "EXOPROOF_TIMEOUT")]
    #[setting(default = 10)]
    pub timeout: u64,

    /// What delimiter should be used when replacing placeholders
    #[setting(env = "EXOPROOF_PLACEHOLDER_DELIM")]
    #[setting(default = "%")]
    pub placeholder_delimiter: String,

    /// Placeholder keys, and the values they should be replaced with
    pub placeholders: HashMap<String, String>,

    /// Directory to write a viewport screenshot to when a scenario fails
    #[setting(env = "EXOPROOF_FAILURE_SCREENSHOT_LOCATION")]
    pub failure_screenshot_location: Option<PathBuf>,
}

// The configuration object used internally
#[derive(Debug, Clone)]
pub struct ExoproofContext {
    pub working_directory: PathBuf,
    pub local_storage_dir: PathBuf,
    pub params: ExoproofParams,
}

impl ExoproofContext {
    pub fn load(mut config: ExoproofParams) -> Result<Self, std::io::Error> {
        let working_directory = env::current_dir()?;

        if let Some(root) = config.root.as_mut() {
            *root = working_directory.join(root.clone());
        }

        let local_storage_dir = config
            .local_storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_STORAGE_DIR));

        Ok(Self {
            working_directory,
            local_storage_dir,
            params: config,
        })
    }
}

impl ExoproofParams {
    fn override_from_cli(&mut self, cli_matches: ArgMatches) -> Result<(), String> {
        if cli_matches.get_flag("verbose") {
            self.verbose = true;
        }

        if cli_matches.get_flag("porcelain") {
            self.porcelain = true;
        }

        if cli_matches.get_flag("headed") {
            self.headed = true;
        }

        if let Some(name) = cli_matches.get_one::<String>("name") {
            self.run_name = Some(name.clone());
        }

        if let Some(root) = cli_matches.get_one::<PathBuf>("root") {
            self.root = Some(root.clone());
        }

        if let Some(base_url) = cli_matches.get_one::<String>("base-url") {
            self.base_url = base_url.clone();
        }

        if let Some(dir) = cli_matches.get_one::<PathBuf>("local-storage-dir") {
            self.local_storage_dir = Some(dir.clone());
        }

        if let Some(timeout) = cli_matches.get_one::<u64>("timeout") {
            self.timeout = *timeout;
        }

        if let Some(placeholder_delimiter) = cli_matches.get_one::<String>("placeholder-delimiter")
        {
            self.placeholder_delimiter = placeholder_delimiter.clone();
        }

        if let Some(placeholders) = cli_matches.get_many::<String>("placeholders") {
            for placeholder in placeholders {
                let Some((key, value)) = placeholder.split_once('=') else {
                    return Err(format!("Error parsing --placeholders, expected a value of key=value but received {placeholder}"));
                };

                self.placeholders.insert(key.into(), value.into());
            }
        }

        Ok(())
    }
}
