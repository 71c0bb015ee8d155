/// Asset Lifecycle - command line runner
///
/// Applies one form submission to one image field of a JSON document and prints
/// the updated document.
///
/// Usage: asset-lifecycle <single|multi> <field> <record.json> <submission.json>
use anyhow::{bail, Context};
use asset_lifecycle::{
    remote, AssetList, AssetRecord, FieldConfig, FormSubmission, MultiAssetController,
    SingleAssetController, StoreConfig,
};
use serde_json::Value;
use tokio::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "asset_lifecycle=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let [_, mode, field, record_path, submission_path] = args.as_slice() else {
        bail!("usage: asset-lifecycle <single|multi> <field> <record.json> <submission.json>");
    };

    // Load configuration
    let store_config = StoreConfig::from_env()?;
    let field_config = FieldConfig::from_env(field)?;
    let remote = remote::connect(&store_config).await?;

    let mut document: Value = serde_json::from_str(
        &fs::read_to_string(record_path)
            .await
            .with_context(|| format!("reading {}", record_path))?,
    )
    .context("record must be a JSON document")?;
    if !document.is_object() {
        bail!("record must be a JSON object");
    }
    let submission: FormSubmission = serde_json::from_str(
        &fs::read_to_string(submission_path)
            .await
            .with_context(|| format!("reading {}", submission_path))?,
    )
    .context("invalid submission")?;

    let current = document.get(field.as_str()).cloned().unwrap_or(Value::Null);
    let owner = document.clone();

    let (updated, result) = match mode.as_str() {
        "single" => {
            let controller = SingleAssetController::new(field_config, store_config, remote)?;
            let mut record: AssetRecord = if current.is_null() {
                AssetRecord::empty()
            } else {
                serde_json::from_value(current).context("invalid asset record")?
            };
            let result = controller
                .handle(&mut record, &submission, &owner)
                .await
                .map(|outcome| format!("{:?}", outcome));
            (serde_json::to_value(&record)?, result)
        }
        "multi" => {
            let controller = MultiAssetController::new(field_config, store_config, remote)?;
            let mut list: AssetList = if current.is_null() {
                AssetList::new()
            } else {
                serde_json::from_value(current).context("invalid asset list")?
            };
            let result = controller
                .handle(&mut list, &submission, &owner)
                .await
                .map(|outcome| format!("{:?}", outcome));
            (serde_json::to_value(&list)?, result)
        }
        other => bail!("unknown field mode {:?}, expected single or multi", other),
    };

    // Batch failures still change the list, so the document is printed regardless
    if let Some(fields) = document.as_object_mut() {
        fields.insert(field.clone(), updated);
    }
    println!("{}", serde_json::to_string_pretty(&document)?);

    let outcome = result?;
    tracing::info!("{}", outcome);
    Ok(())
}
