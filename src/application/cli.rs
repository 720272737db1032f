#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::BackendName;
use crate::domain::services::actions::help_text;
use crate::domain::services::ArtifactStore;

/// What `main` should do once the command line has been handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Launch {
    Chat,
    Run(String),
    Exit,
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn print_artifacts_list() -> Result<()> {
    let artifacts = ArtifactStore::default().list().await?;
    if artifacts.is_empty() {
        println!("No programs have been generated yet.");
        return Ok(());
    }

    let res = artifacts
        .iter()
        .map(|artifact| {
            return artifact.to_string_lossy().to_string();
        })
        .collect::<Vec<String>>();

    println!("{}", res.join("\n"));
    return Ok(());
}

fn config_arg(key: ConfigKey, help: &str) -> Arg {
    let env_name = format!("MENDER_{}", key.to_string().replace('-', "_").to_uppercase());
    let mut help = help.to_string();
    let default = Config::default(key);
    if !default.is_empty() {
        help = format!("{help} [default: {default}]");
    }

    return Arg::new(key.to_string())
        .long(key.to_string())
        .env(env_name)
        .num_args(1)
        .help(help)
        .global(true);
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_artifacts() -> Command {
    return Command::new("artifacts")
        .about("Inspect generated programs.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the directory generated programs are saved to."))
        .subcommand(Command::new("list").about("List every generated program, oldest first."));
}

fn subcommand_run() -> Command {
    return Command::new("run")
        .about("Generate, run, and repair a single program without the chat interface. Exits non-zero when the program never ran cleanly.")
        .arg(
            Arg::new("prompt")
                .help("Description of the program to write.")
                .num_args(1..)
                .required(true),
        );
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") || line.starts_with("HOTKEYS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("mender")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("chat").about("Start a new chat session."))
        .subcommand(subcommand_run())
        .subcommand(subcommand_artifacts())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .arg(
            config_arg(ConfigKey::Backend, "The backend hosting the model to connect to.")
                .short('b')
                .value_parser(PossibleValuesParser::new(BackendName::VARIANTS)),
        )
        .arg(config_arg(
            ConfigKey::BackendHealthCheckTimeout,
            "Time to wait in milliseconds before timing out when doing a healthcheck for a backend.",
        ))
        .arg(config_arg(ConfigKey::Model, "The model used to generate programs.").short('m'))
        .arg(
            config_arg(ConfigKey::ConfigFile, "Path to configuration file.").short('c'),
        )
        .arg(config_arg(
            ConfigKey::Interpreter,
            "Executable that runs generated programs. It receives the program path as its only argument.",
        ).short('i'))
        .arg(config_arg(
            ConfigKey::ArtifactsDir,
            "Directory generated programs are saved to.",
        ))
        .arg(config_arg(
            ConfigKey::ArtifactSuffix,
            "File extension for generated programs.",
        ))
        .arg(config_arg(
            ConfigKey::MaxIterations,
            "How many times a failing program is sent back to the model for a fix.",
        ))
        .arg(config_arg(
            ConfigKey::ExecutionTimeout,
            "Seconds a generated program may run before it is killed.",
        ))
        .arg(config_arg(
            ConfigKey::OllamaURL,
            "Ollama API URL when using the Ollama backend.",
        ))
        .arg(config_arg(
            ConfigKey::OpenAiURL,
            "OpenAI API URL when using the OpenAI backend. Can be swapped to a compatible proxy.",
        ))
        .arg(config_arg(
            ConfigKey::OpenAiToken,
            "OpenAI API token when using the OpenAI backend.",
        ));
}

fn prompt_from_matches(matches: &ArgMatches) -> String {
    return matches
        .get_many::<String>("prompt")
        .map(|words| {
            return words.map(|word| return word.as_str()).collect::<Vec<&str>>().join(" ");
        })
        .unwrap_or_default();
}

pub async fn parse() -> Result<Launch> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("run", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let prompt = prompt_from_matches(subcmd_matches);
            if prompt.trim().is_empty() {
                bail!("The prompt must not be empty");
            }

            return Ok(Launch::Run(prompt));
        }
        Some(("artifacts", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            match subcmd_matches.subcommand() {
                Some(("dir", _)) => {
                    println!("{}", ArtifactStore::default().dir.to_string_lossy());
                }
                Some(("list", _)) => {
                    print_artifacts_list().await?;
                }
                _ => {
                    subcommand_artifacts().print_long_help()?;
                }
            }

            return Ok(Launch::Exit);
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }

            return Ok(Launch::Exit);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(Launch::Exit);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(Launch::Exit);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(Launch::Exit);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(Launch::Exit);
            }
        },
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(Launch::Chat);
}
