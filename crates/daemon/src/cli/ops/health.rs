use clap::Args;

use jailbird_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    #[error("Health check failed: {0}")]
    Failed(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config directory
        lines.push("Config:".to_string());
        match ctx.state() {
            Ok(state) => {
                lines.push(format!("  directory:    {}", state.jailbird_dir.display()));
                lines.push("  config.toml:  OK".to_string());
                lines.push("  db.sqlite:    OK".to_string());
                lines.push("  keys/:        OK".to_string());
                lines.push(format!("  api_port:     {}", state.config.api_port));
                lines.push(format!(
                    "  user:         {}",
                    state.config.user.as_deref().unwrap_or("(unset)")
                ));
                lines.push(key_store_line(&state).await);
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Check daemon endpoints
        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));

        for endpoint in ["livez", "readyz"] {
            let url = format!("{}/_status/{}", base.as_str().trim_end_matches('/'), endpoint);
            let status = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => "OK".to_string(),
                Ok(resp) => format!("UNHEALTHY ({})", resp.status()),
                Err(_) => "NOT REACHABLE".to_string(),
            };
            lines.push(format!("  {:<7} {}", format!("{}:", endpoint), status));
        }

        Ok(lines.join("\n"))
    }
}

async fn key_store_line(state: &AppState) -> String {
    let client = common::client::KeyClient::new(state.key_store());
    match client.initialize_from_store().await {
        Ok(report) if report.failed_count() == 0 => {
            format!("  keys:         {} loaded", report.loaded)
        }
        Ok(report) => format!(
            "  keys:         {} loaded, {} unreadable",
            report.loaded,
            report.failed_count()
        ),
        Err(e) => format!("  keys:         error: {}", e),
    }
}
