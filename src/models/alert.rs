use std::{fmt, str::FromStr};

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
        }
    }

    /// Both directions are inclusive at the target.
    pub fn is_met(&self, price: f64, target_price: f64) -> bool {
        match self {
            AlertCondition::Above => price >= target_price,
            AlertCondition::Below => price <= target_price,
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(AlertCondition::Above),
            "below" => Ok(AlertCondition::Below),
            other => Err(format!("unknown condition '{other}'")),
        }
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,

    pub condition: AlertCondition,
    pub target_price: f64,

    #[serde(default = "default_active")]
    pub is_active: bool,

    // bumped when the owner re-arms the alert or changes its rule
    #[serde(default)]
    pub generation: i64,

    pub created_at: i64,

    #[serde(default)]
    pub triggered_at: Option<i64>,
}

/// User-supplied alert fields, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub symbol: String,
    pub target_price: f64,
    pub condition: AlertCondition,
    pub is_active: Option<bool>,
}

impl Alert {
    pub fn from_draft(user_id: ObjectId, draft: &AlertDraft, now: i64) -> Self {
        Self {
            id: ObjectId::new(),
            user_id,
            symbol: draft.symbol.clone(),
            condition: draft.condition,
            target_price: draft.target_price,
            is_active: draft.is_active.unwrap_or(true),
            generation: 0,
            created_at: now,
            triggered_at: None,
        }
    }

    /// Applies an owner update. Re-activating an inactive alert or changing
    /// its symbol, target or condition starts a new generation, so a
    /// notification recorded for the old rule does not cover the new one.
    pub fn apply_draft(&mut self, draft: &AlertDraft) {
        let rule_changed = self.symbol != draft.symbol
            || self.condition != draft.condition
            || self.target_price != draft.target_price;
        let rearmed = draft.is_active == Some(true) && !self.is_active;

        if rule_changed || rearmed {
            self.generation += 1;
        }
        if rearmed {
            self.triggered_at = None;
        }

        self.symbol = draft.symbol.clone();
        self.condition = draft.condition;
        self.target_price = draft.target_price;
        if let Some(active) = draft.is_active {
            self.is_active = active;
        }
    }

    /// Rejects rows the evaluator cannot act on.
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("missing symbol".to_string());
        }
        if !self.target_price.is_finite() || self.target_price <= 0.0 {
            return Err(format!("invalid target price {}", self.target_price));
        }
        Ok(())
    }
}
