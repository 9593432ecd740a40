//! Prediction options panel, backed by the local service

use serde_json::Value;
use tracing::info;

use super::AdminConsole;
use crate::api::{NewPredictionOption, PredictionOption};
use crate::error::{ClientError, ClientResult};

/// Display order used everywhere options are listed
pub fn sort_options(options: &mut [PredictionOption]) {
    options.sort_by_key(|o| (o.sort_order, o.seconds));
}

impl AdminConsole {
    pub async fn prediction_options(&self) -> ClientResult<Vec<PredictionOption>> {
        let mut options = self.options.list(None, None).await?;
        sort_options(&mut options);
        Ok(options)
    }

    pub async fn create_option(&self, option: &NewPredictionOption) -> ClientResult<Vec<PredictionOption>> {
        option.validate().map_err(ClientError::validation)?;
        let created = self.options.create(option).await?;
        info!(id = %created.id, seconds = created.seconds, "Prediction option created");
        self.prediction_options().await
    }

    pub async fn update_option(&self, id: &str, option: &NewPredictionOption) -> ClientResult<Vec<PredictionOption>> {
        option.validate().map_err(ClientError::validation)?;
        let body = serde_json::to_value(option).map_err(|e| ClientError::validation(e.to_string()))?;
        let body = strip_nulls(body);
        self.options.update(id, &body).await?;
        info!(id = %id, "Prediction option updated");
        self.prediction_options().await
    }

    pub async fn delete_option(&self, id: &str) -> ClientResult<Vec<PredictionOption>> {
        self.options.delete(id).await?;
        info!(id = %id, "Prediction option deleted");
        self.prediction_options().await
    }
}

/// Unset optional fields must not overwrite stored values
fn strip_nulls(body: Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}
