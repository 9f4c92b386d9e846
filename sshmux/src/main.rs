// Copyright 2026 The sshmux Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Thin command line wrapper around `sshmux_core`. Parses arguments,
//! wires up logging and configuration, and dispatches one subcommand
//! before exiting -- this binary holds no session state of its own.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use sshmux_core::{
    model::RawAuth, Config, SessionConfig, SessionManager,
};

/// The command line arguments sshmux expects.
#[derive(Parser, Debug)]
#[clap(author, about)]
struct Args {
    #[clap(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Show more in logs, may be provided multiple times",
    )]
    verbose: u8,

    #[clap(short, long, action, help = "a toml file containing configuration")]
    config_file: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[clap(about = "Creates a new shell session over ssh")]
    Create {
        #[clap(help = "The name to register the new session under")]
        name: String,
        #[clap(long, help = "Host to ssh to")]
        host: String,
        #[clap(long, default_value_t = 22, help = "Port to ssh to")]
        port: u16,
        #[clap(long, help = "Username to authenticate as")]
        user: String,
        #[clap(long, help = "Inline private key text (PEM), takes priority over --key-file")]
        key_text: Option<String>,
        #[clap(long, help = "Path to a private key file")]
        key_file: Option<String>,
        #[clap(long, help = "Passphrase for the private key, if it is encrypted")]
        passphrase: Option<String>,
        #[clap(long, help = "Password, used only if no key material is given")]
        password: Option<String>,
    },

    #[clap(about = "lists all the running shell sessions")]
    List,

    #[clap(about = "Runs a command against an existing session and waits for it to finish")]
    Exec {
        #[clap(help = "The name of the session to run the command on")]
        name: String,
        #[clap(help = "The command text to run")]
        command: String,
        #[clap(long, default_value = "programClient", help = "\"user\" or \"programClient\"")]
        source: String,
        #[clap(long, help = "Timeout, in milliseconds, before the command is treated as hung")]
        timeout_ms: Option<u64>,
    },

    #[clap(about = "Writes raw bytes to a session's stdin without queueing a command")]
    SendInput {
        #[clap(help = "The name of the session to write to")]
        name: String,
        #[clap(help = "The literal bytes to write, interpreted as UTF-8")]
        text: String,
    },

    #[clap(about = "Sends a signal (SIGINT, SIGTERM, SIGQUIT, SIGTSTP) to a session")]
    SendSignal {
        #[clap(help = "The name of the session to signal")]
        name: String,
        #[clap(help = "One of SIGINT, SIGTERM, SIGQUIT, SIGTSTP")]
        signal: String,
    },

    #[clap(about = "Resizes a session's pty")]
    Resize {
        #[clap(help = "The name of the session to resize")]
        name: String,
        #[clap(help = "Number of columns")]
        cols: i64,
        #[clap(help = "Number of rows")]
        rows: i64,
    },

    #[clap(about = "Prints the finished-command history for a session")]
    History {
        #[clap(help = "The name of the session to inspect")]
        name: String,
    },

    #[clap(about = "Prints the observer-socket url a live viewer would connect to")]
    ObserverUrl {
        #[clap(help = "The name of the session to inspect")]
        name: String,
    },

    #[clap(about = "Disconnects the given session, tearing down its shell")]
    Disconnect {
        #[clap(help = "The name of the session to disconnect")]
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let trace_level = if args.verbose == 0 {
        tracing::Level::INFO
    } else if args.verbose == 1 {
        tracing::Level::DEBUG
    } else {
        tracing::Level::TRACE
    };
    tracing_subscriber::fmt()
        .with_max_level(trace_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config: Config = sshmux_core::config::read_config(&args.config_file)?;
    run(config, args.command)
}

fn run(config: Config, command: Commands) -> anyhow::Result<()> {
    let manager = SessionManager::new(config);

    match command {
        Commands::Create { name, host, port, user, key_text, key_file, passphrase, password } => {
            let auth = RawAuth {
                private_key_text: key_text,
                key_file_path: key_file,
                password,
                passphrase,
            }
            .resolve()
            .context("resolving auth method")?;
            manager
                .create_session(SessionConfig { name: name.clone(), host, port, username: user, auth })
                .context("creating session")?;
            println!("created session '{name}'");
        }

        Commands::List => {
            for name in manager.list_sessions() {
                println!("{name}");
            }
        }

        Commands::Exec { name, command, source, timeout_ms } => {
            let timeout = timeout_ms.map(std::time::Duration::from_millis);
            let result = manager
                .exec_command(&name, command, timeout, &source)
                .context("running command")?;
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            if result.exit_code != 0 {
                return Err(anyhow!("command exited with status {}", result.exit_code));
            }
        }

        Commands::SendInput { name, text } => {
            manager.send_input(&name, text.into_bytes()).context("sending input")?;
        }

        Commands::SendSignal { name, signal } => {
            manager.send_signal(&name, &signal).context("sending signal")?;
        }

        Commands::Resize { name, cols, rows } => {
            manager.resize(&name, cols, rows).context("resizing pty")?;
        }

        Commands::History { name } => {
            for record in manager.get_command_history(&name).context("fetching history")? {
                println!(
                    "[{}] {} -> exit {} ({:?}, {}ms)",
                    record.started_at_ms,
                    record.command_text,
                    record.exit_code,
                    record.status,
                    record.duration_ms,
                );
            }
        }

        Commands::ObserverUrl { name } => {
            println!("{}", manager.get_observer_url(&name).context("resolving observer url")?);
        }

        Commands::Disconnect { name } => {
            manager.disconnect(&name).context("disconnecting session")?;
        }
    }

    Ok(())
}
