use std::fs;
use std::path::Path;

use chrono::Utc;
use serde_json::json;

use crate::commands::CommandResult;
use tripdesk_core::config::{AppConfig, LoadOptions};
use tripdesk_core::{evaluate_policy, Offer, TravelerId};
use tripdesk_db::connect_with_settings;
use tripdesk_db::repositories::{
    PolicyRepository, SqlPolicyRepository, SqlTravelerRepository, TravelerRepository,
};

/// Dry-run a fare against the traveler's active policy, without touching
/// bookings or the supplier. The same evaluation runs again inside
/// `create_booking`, so the answer here is the answer the booking path gives.
pub fn run(offer_path: &Path, traveler_id: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "evaluate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let offer = match read_offer(offer_path) {
        Ok(offer) => offer,
        Err(message) => return CommandResult::failure("evaluate", "offer_input", message, 5),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "evaluate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let traveler = SqlTravelerRepository::new(pool.clone())
            .find_by_id(&TravelerId(traveler_id.to_string()))
            .await
            .map_err(|error| ("db_query", error.to_string(), 4u8))?
            .ok_or_else(|| {
                ("unknown_traveler", format!("no traveler with id `{traveler_id}`"), 6u8)
            })?;

        let policy = SqlPolicyRepository::new(pool.clone())
            .find_active(&traveler.org_id)
            .await
            .map_err(|error| ("db_query", error.to_string(), 4u8))?
            .ok_or_else(|| {
                (
                    "no_active_policy",
                    format!("org `{}` has no active travel policy", traveler.org_id.0),
                    6u8,
                )
            })?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>((traveler, policy))
    });

    let (traveler, policy) = match result {
        Ok(pair) => pair,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("evaluate", error_class, message, exit_code);
        }
    };

    let verdict = evaluate_policy(&offer, &traveler, &policy, Utc::now());
    let message = if verdict.needs_approval {
        format!(
            "offer for `{}` needs approval under policy v{}: {}",
            traveler.full_name,
            verdict.policy_version,
            verdict.summary()
        )
    } else {
        format!(
            "offer for `{}` is within policy v{} and would book automatically",
            traveler.full_name, verdict.policy_version
        )
    };
    let data = serde_json::to_value(&verdict).unwrap_or_else(|_| json!(null));
    CommandResult::success_with_data("evaluate", message, data)
}

fn read_offer(path: &Path) -> Result<Offer, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read offer file `{}`: {error}", path.display()))?;
    serde_json::from_str(&raw).map_err(|error| {
        format!("offer file `{}` is not a valid offer document: {error}", path.display())
    })
}
