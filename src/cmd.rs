use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

/// Options of the Interest generator
#[derive(Debug, clap::Args, Clone)]
pub struct ClientArgs {
    #[arg(
        short,
        long,
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Delay between two Interests, in milliseconds"
    )]
    pub interval: u64,
    #[arg(short, long, default_value = None, help = "Maximum number of Interests to send")]
    pub count: Option<u64>,
    #[arg(
        short,
        long,
        default_value_t = false,
        help = "Do not log each sent Interest and received Data"
    )]
    pub quiet: bool,
    #[arg(short, long, help = "Seed for random number generation")]
    pub seed: Option<u64>,
    #[arg(long, default_value = None, help = "Also write the final report to this JSON file")]
    pub report_json: Option<PathBuf>,
    #[arg(help = "Traffic configuration file of the client")]
    pub config: PathBuf,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Generate Interests according to the traffic patterns of a configuration file and report
    /// the received Data, Nacks and timeouts.
    Client {
        #[command(flatten)]
        args: ClientArgs,
    },
    /// Answer the Interests under the prefixes of a configuration file with generated Data.
    Server {
        #[arg(short, long, default_value = None, help = "Delay added to every reply, in milliseconds")]
        delay: Option<u64>,
        #[arg(short, long, default_value = None, help = "Maximum number of Interests to answer")]
        count: Option<u64>,
        #[arg(
            short,
            long,
            default_value_t = false,
            help = "Do not log each received Interest"
        )]
        quiet: bool,
        #[arg(short, long, help = "Seed for random number generation")]
        seed: Option<u64>,
        #[arg(long, default_value = None, help = "Also write the final report to this JSON file")]
        report_json: Option<PathBuf>,
        #[arg(help = "Traffic configuration file of the server")]
        config: PathBuf,
    },
    /// Run a server and a client in the same process, connected by an in-process forwarder. The
    /// server stops with the client.
    Loopback {
        #[command(flatten)]
        args: ClientArgs,
        #[arg(long, required = true, help = "Traffic configuration file of the server")]
        server_config: PathBuf,
        #[arg(short, long, default_value = None, help = "Delay added to every reply, in milliseconds")]
        delay: Option<u64>,
    },
}
