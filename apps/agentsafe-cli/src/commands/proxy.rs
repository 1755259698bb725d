// proxy.rs — Start the reverse proxy.

use std::process::ExitCode;

use agentsafe_proxy::{run_proxy, ProxyConfig};

pub async fn execute(host: &str, port: u16) -> anyhow::Result<ExitCode> {
    let config = ProxyConfig::from_env();
    println!("agentsafe proxy listening on {host}:{port}");
    println!(
        "upstream={} policy={} backend={} adapter={}",
        config.upstream, config.policy_path, config.policy_backend, config.adapter
    );
    run_proxy(config, host, port).await?;
    Ok(ExitCode::from(0))
}
