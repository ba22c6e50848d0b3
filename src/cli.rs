use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "subscout",
    about = "Passive subdomain enumeration over public data sources",
    long_about = "Subscout discovers subdomains of a target domain by querying \
certificate-transparency logs, passive-DNS indexes, URL-scan archives and \
web-archive snapshots, merging everything into one sorted, deduplicated list.\n\
Without a target it does nothing and exits 0, so it can sit quietly in shell pipelines."
)]
pub struct Args {
    /// Target domain to enumerate
    #[arg(value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// Output file (stdout when omitted)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_file: Option<String>,

    /// Specific sources to use (comma-separated)
    #[arg(short = 's', long = "sources", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Per-source timeout in seconds
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// API key for sources that accept one
    #[arg(long = "api-key", value_name = "KEY")]
    pub api_key: Option<String>,

    /// Verify TLS certificates even for sources with known certificate friction
    #[arg(long = "verify-tls")]
    pub verify_tls: bool,

    /// Maximum number of extra result pages fetched from paginated sources
    #[arg(long = "max-pages", value_name = "N")]
    pub max_pages: Option<usize>,

    /// List all available sources
    #[arg(long = "list-sources")]
    pub list_sources: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_path: Option<String>,
}
