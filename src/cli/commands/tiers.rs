use anyhow::{anyhow, Context};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::cli::utils::{output_success, output_tiers};
use crate::cli::OutputFormat;
use crate::config;
use crate::waterfall::{default_tier_set, validate_tier, TierDraft};

#[derive(Subcommand)]
pub enum TierCommands {
    #[command(about = "Validate tiers from a YAML or JSON file")]
    Validate {
        #[arg(help = "File holding a list of tiers (or an object with a `tiers` list)")]
        file: PathBuf,
    },

    #[command(about = "Preview the default four-tier waterfall")]
    Defaults {
        #[arg(long, help = "Hurdle rate percent (preferred return IRR)")]
        hurdle: Option<Decimal>,
        #[arg(long, help = "Carried interest percent")]
        carry: Option<Decimal>,
    },

    #[command(about = "List a structure's tiers from a running server")]
    List {
        #[arg(help = "Structure ID")]
        structure: Uuid,
        #[arg(long, help = "Include deactivated tiers")]
        all: bool,
        #[command(flatten)]
        remote: RemoteArgs,
    },

    #[command(about = "Create the default tiers for a structure on a running server")]
    Seed {
        #[arg(help = "Structure ID")]
        structure: Uuid,
        #[arg(long, help = "Hurdle rate percent (server default if omitted)")]
        hurdle: Option<Decimal>,
        #[arg(long, help = "Carried interest percent (server default if omitted)")]
        carry: Option<Decimal>,
        #[command(flatten)]
        remote: RemoteArgs,
    },
}

#[derive(Args)]
pub struct RemoteArgs {
    #[arg(long, env = "WATERFALL_SERVER", default_value = "http://localhost:3000", help = "Server base URL")]
    pub server: String,
    #[arg(long, env = "WATERFALL_TOKEN", help = "Bearer token (see `waterfall token issue`)")]
    pub token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TierFile {
    List(Vec<TierDraft>),
    Wrapped { tiers: Vec<TierDraft> },
}

pub async fn handle(cmd: TierCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TierCommands::Validate { file } => validate_file(&file, output_format),
        TierCommands::Defaults { hurdle, carry } => {
            let defaults = &config::config().waterfall;
            let tiers = default_tier_set(
                Uuid::nil(),
                hurdle.unwrap_or(defaults.default_hurdle_rate),
                carry.unwrap_or(defaults.default_carry),
                Uuid::nil(),
            );
            output_tiers(&output_format, &tiers)
        }
        TierCommands::List { structure, all, remote } => {
            let url = format!(
                "{}/api/structures/{}/waterfall-tiers?includeInactive={}",
                remote.server.trim_end_matches('/'),
                structure,
                all
            );
            let data = send(remote.authorize(reqwest::Client::new().get(url))?).await?;
            output_tiers(&output_format, data.as_array().map(Vec::as_slice).unwrap_or_default())
        }
        TierCommands::Seed {
            structure,
            hurdle,
            carry,
            remote,
        } => {
            let url = format!(
                "{}/api/structures/{}/waterfall-tiers/defaults",
                remote.server.trim_end_matches('/'),
                structure
            );
            let body = json!({ "hurdleRatePercent": hurdle, "carryPercent": carry });
            let data = send(remote.authorize(reqwest::Client::new().post(url).json(&body))?).await?;
            output_success(
                &output_format,
                &format!("Created default waterfall for structure {}", structure),
                Some(data.clone()),
            )?;
            if let OutputFormat::Text = output_format {
                output_tiers(&output_format, data.as_array().map(Vec::as_slice).unwrap_or_default())?;
            }
            Ok(())
        }
    }
}

impl RemoteArgs {
    fn authorize(&self, request: reqwest::RequestBuilder) -> anyhow::Result<reqwest::RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("No token: pass --token or set WATERFALL_TOKEN"))?;
        Ok(request.bearer_auth(token))
    }
}

/// Send a request and unwrap the `{ success, data }` envelope
async fn send(request: reqwest::RequestBuilder) -> anyhow::Result<Value> {
    let response = request.send().await.context("request to server failed")?;
    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .with_context(|| format!("server returned non-JSON response ({})", status))?;

    if payload["success"].as_bool() == Some(true) {
        return Ok(payload["data"].clone());
    }

    let message = payload["message"]
        .as_str()
        .or_else(|| payload["error"].as_str())
        .unwrap_or("request failed");
    let mut detail = format!("{} ({})", message, status);
    if let Some(errors) = payload["errors"].as_array() {
        for e in errors.iter().filter_map(|e| e.as_str()) {
            detail.push_str(&format!("\n  - {}", e));
        }
    }
    if let Some(applied) = payload["applied"].as_array() {
        detail.push_str(&format!("\n  {} edits were applied before the failure", applied.len()));
    }
    Err(anyhow!(detail))
}

fn validate_file(path: &Path, output_format: OutputFormat) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let drafts = parse_tier_file(&content).with_context(|| format!("parsing {}", path.display()))?;

    let results: Vec<Value> = drafts
        .iter()
        .map(|draft| {
            let validation = validate_tier(draft);
            json!({
                "tierNumber": draft.tier_number,
                "tierName": draft.tier_name,
                "isValid": validation.is_valid,
                "errors": validation.errors,
            })
        })
        .collect();
    let invalid = results.iter().filter(|r| r["isValid"] == json!(false)).count();

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            for r in results.iter() {
                let label = r["tierName"].as_str().unwrap_or("-");
                if r["isValid"] == json!(true) {
                    println!("✓ Tier {} ({})", r["tierNumber"], label);
                } else {
                    println!("✗ Tier {} ({})", r["tierNumber"], label);
                    for e in r["errors"].as_array().into_iter().flatten() {
                        println!("    {}", e.as_str().unwrap_or_default());
                    }
                }
            }
        }
    }

    if invalid > 0 {
        return Err(anyhow!("{} of {} tiers failed validation", invalid, results.len()));
    }
    Ok(())
}

fn parse_tier_file(content: &str) -> anyhow::Result<Vec<TierDraft>> {
    // YAML is a superset of JSON, so one parser covers both
    let file: TierFile = serde_yaml::from_str(content)?;
    Ok(match file {
        TierFile::List(tiers) => tiers,
        TierFile::Wrapped { tiers } => tiers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_yaml_list() {
        let tiers = parse_tier_file(
            r#"
- tierNumber: 1
  tierName: Return of Capital
  lpSharePercent: 100
  gpSharePercent: 0
- tierNumber: 4
  lpSharePercent: 80
  gpSharePercent: 20
  thresholdIrr: 12.5
"#,
        )
        .unwrap();
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].tier_name.as_deref(), Some("Return of Capital"));
        assert_eq!(tiers[1].threshold_irr, Some(dec!(12.5)));
        assert!(tiers.iter().all(|t| validate_tier(t).is_valid));
    }

    #[test]
    fn parses_wrapped_json() {
        let tiers = parse_tier_file(
            r#"{"tiers": [{"tierNumber": 2, "lpSharePercent": 60, "gpSharePercent": 30}]}"#,
        )
        .unwrap();
        assert_eq!(tiers.len(), 1);
        assert!(!validate_tier(&tiers[0]).is_valid);
    }

    #[test]
    fn rejects_tier_without_shares() {
        assert!(parse_tier_file("- tierNumber: 1\n").is_err());
    }
}
