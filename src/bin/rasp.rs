//! rasp command line: fetch a page directly or through Tor.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rasp::engine::{Engine, FetchOptions};
use rasp::http::headerset::HeaderSet;
use rasp::http::webpage::Webpage;
use rasp::proxy::ProxySettings;
use rasp::tor::config::TorOptions;
use rasp::tor::TorEngine;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(
    name = "rasp",
    about = "Fetch web pages, optionally through Tor with identity refresh",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one URL and print its source.
    Fetch {
        url: String,

        /// Extra header as `Name: value`. Repeatable.
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Query parameter as `key=value`. Repeatable.
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Route through Tor.
        #[arg(long)]
        tor: bool,

        /// Request a new Tor identity before fetching (implies --tor).
        #[arg(long)]
        refresh_ip: bool,

        /// Tor SOCKS address (also RASP_TOR_ADDRESS).
        #[arg(long)]
        tor_address: Option<String>,

        /// Tor SOCKS port (also RASP_TOR_PORT).
        #[arg(long)]
        tor_port: Option<u16>,

        /// Tor control port (also RASP_TOR_CONTROL_PORT).
        #[arg(long)]
        control_port: Option<u16>,

        /// Tor control password (also RASP_TOR_CONTROL_PASSWORD). Prompted
        /// for when --refresh-ip needs it and none is configured.
        #[arg(long)]
        control_password: Option<String>,

        /// Proxy URL for a direct fetch (http, https, socks5, socks5h).
        #[arg(long, conflicts_with_all = ["tor", "refresh_ip", "proxy_from_env"])]
        proxy: Option<String>,

        /// Take the direct-fetch proxy from HTTPS_PROXY / HTTP_PROXY.
        #[arg(long, conflicts_with_all = ["tor", "refresh_ip"])]
        proxy_from_env: bool,

        /// Proxy credentials as `user:password`.
        #[arg(long)]
        proxy_auth: Option<String>,

        /// Print response headers instead of the source.
        #[arg(long)]
        show_headers: bool,
    },
}

fn split_pair<'a>(raw: &'a str, sep: char, what: &str) -> anyhow::Result<(&'a str, &'a str)> {
    match raw.split_once(sep) {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim(), v.trim())),
        _ => bail!("invalid {} {:?}, expected key{}value", what, raw, sep),
    }
}

/// Read the control password from stdin after prompting on stderr.
async fn prompt_password() -> anyhow::Result<String> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(b"Tor control password: ").await?;
    stderr.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("reading control password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn direct_proxy(
    url: Option<String>,
    from_env: bool,
    auth: Option<String>,
) -> anyhow::Result<Option<ProxySettings>> {
    let proxy = match (url, from_env) {
        (Some(url), _) => Some(ProxySettings::new(&url)?),
        (None, true) => ProxySettings::from_env(),
        (None, false) => None,
    };
    match (proxy, auth) {
        (Some(proxy), Some(auth)) => {
            let (user, pass) = auth
                .split_once(':')
                .context("--proxy-auth expects user:password")?;
            Ok(Some(proxy.with_auth(user, pass)))
        }
        (None, Some(_)) => bail!("--proxy-auth needs --proxy or --proxy-from-env"),
        (proxy, None) => Ok(proxy),
    }
}

fn print_page(page: &Webpage, show_headers: bool) {
    if show_headers {
        for (name, value) in page {
            println!("{}: {}", name, value);
        }
    } else {
        println!("{}", page.source());
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch {
            url,
            headers,
            params,
            tor,
            refresh_ip,
            tor_address,
            tor_port,
            control_port,
            control_password,
            proxy,
            proxy_from_env,
            proxy_auth,
            show_headers,
        } => {
            let mut options = FetchOptions::new().refresh_ip(refresh_ip);
            for raw in &headers {
                let (name, value) = split_pair(raw, ':', "header")?;
                options = options.header(name, value);
            }
            for raw in &params {
                let (key, value) = split_pair(raw, '=', "param")?;
                options = options.param(key, value);
            }

            let page = if tor || refresh_ip {
                let tor_options = TorOptions {
                    address: tor_address,
                    port: tor_port,
                    control_port,
                    control_password,
                };
                let mut engine = TorEngine::new(HeaderSet::new(), tor_options)?;
                if refresh_ip && !engine.config().control_password.is_set() {
                    let password = prompt_password().await?;
                    engine.set_control_password(password);
                }
                engine.fetch(&url, options).await?
            } else {
                let mut builder = Engine::builder();
                if let Some(proxy) = direct_proxy(proxy, proxy_from_env, proxy_auth)? {
                    builder = builder.proxy(proxy);
                }
                builder.build()?.fetch(&url, options).await?
            };

            match page {
                Some(page) => print_page(&page, show_headers),
                None => bail!("not found: {}", url),
            }
        }
    }

    Ok(())
}
