use mongodb::bson::oid::ObjectId;

use crate::{
    errors::ApiError,
    models::{Alert, AlertCondition, AlertDraft},
    AppState,
};

/// Form posts send `targetPrice` as text; JSON clients send a number.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn value(&self) -> Option<f64> {
        match self {
            PriceInput::Number(v) => Some(*v),
            PriceInput::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Raw alert fields as submitted by a client.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertInput {
    pub stock_symbol: Option<String>,
    pub target_price: Option<PriceInput>,
    pub condition: Option<String>,
    pub is_active: Option<bool>,
}

pub fn validate_input(input: &AlertInput) -> Result<AlertDraft, ApiError> {
    let symbol = input
        .stock_symbol
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    if symbol.is_empty() {
        return Err(ApiError::Validation("\"stockSymbol\" is required".into()));
    }

    let target_price = match input.target_price.as_ref().map(PriceInput::value) {
        Some(Some(v)) if v.is_finite() && v > 0.0 => v,
        Some(_) => {
            return Err(ApiError::Validation(
                "\"targetPrice\" must be a positive number".into(),
            ));
        }
        None => return Err(ApiError::Validation("\"targetPrice\" is required".into())),
    };

    let condition = match input.condition.as_deref() {
        Some(c) => c.parse::<AlertCondition>().map_err(|_| {
            ApiError::Validation("\"condition\" must be one of [above, below]".into())
        })?,
        None => return Err(ApiError::Validation("\"condition\" is required".into())),
    };

    Ok(AlertDraft {
        symbol,
        target_price,
        condition,
        is_active: input.is_active,
    })
}

pub async fn create_alert(
    state: &AppState,
    user_id: ObjectId,
    input: &AlertInput,
) -> Result<Alert, ApiError> {
    let draft = validate_input(input)?;
    let alert = Alert::from_draft(user_id, &draft, state.clock.now());

    state.alerts.insert(&alert).await?;
    tracing::info!(alert_id = %alert.id, user_id = %user_id, symbol = %alert.symbol, "alert created");

    Ok(alert)
}

pub async fn list_user_alerts(state: &AppState, user_id: ObjectId) -> Result<Vec<Alert>, ApiError> {
    Ok(state.alerts.list_for_user(user_id).await?)
}

pub async fn update_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
    input: &AlertInput,
) -> Result<Alert, ApiError> {
    let draft = validate_input(input)?;

    let mut alert = state
        .alerts
        .find_for_user(user_id, alert_id)
        .await?
        .ok_or(ApiError::NotFound("Alert"))?;

    alert.apply_draft(&draft);

    if !state.alerts.replace(&alert).await? {
        return Err(ApiError::NotFound("Alert"));
    }

    Ok(alert)
}

pub async fn delete_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<(), ApiError> {
    if !state.alerts.delete_for_user(user_id, alert_id).await? {
        return Err(ApiError::NotFound("Alert"));
    }
    Ok(())
}
