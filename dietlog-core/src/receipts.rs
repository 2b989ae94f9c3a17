//! Receipts and their follow-up reminders.
//!
//! A receipt can carry a reminder to double-check the bank statement after a
//! delay given in days, hours and minutes. Delivery is delegated to a
//! `NotificationScheduler`; this module only decides when and what to send.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Notification channel reminders are posted to on platforms that need one.
pub const REMINDER_CHANNEL_ID: &str = "receipt-reminder-channel";

pub const REMINDER_TITLE: &str = "Receipt Reminder 📋";

const MS_PER_MINUTE: f64 = 60.0 * 1000.0;
const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;

#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("Please fill in all fields and upload an image")]
    Incomplete,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Please set a time in the future")]
    ReminderInPast,

    #[error("Reminder is too far in the future")]
    ReminderTooFar,

    #[error("Failed to schedule reminder: {0}")]
    Schedule(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub image_location: PathBuf,
    pub title: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// Form input for a new receipt.
#[derive(Debug, Clone)]
pub struct ReceiptDraft {
    pub image_location: Option<PathBuf>,
    pub title: String,
    pub amount: String,
    pub date: DateTime<Utc>,
}

impl ReceiptDraft {
    /// Check every field is filled in and build the receipt.
    pub fn into_receipt(self) -> Result<Receipt, ReceiptError> {
        let image_location = self.image_location.ok_or(ReceiptError::Incomplete)?;
        let title = self.title.trim();
        let amount = self.amount.trim();
        if title.is_empty() || amount.is_empty() {
            return Err(ReceiptError::Incomplete);
        }

        let amount: f64 = amount
            .parse()
            .ok()
            .filter(|a: &f64| a.is_finite())
            .ok_or_else(|| ReceiptError::InvalidAmount(amount.to_string()))?;

        Ok(Receipt {
            id: Uuid::new_v4(),
            image_location,
            title: title.to_string(),
            amount,
            date: self.date,
        })
    }
}

/// In-memory list of receipts, newest last.
#[derive(Debug, Default)]
pub struct ReceiptStore {
    receipts: Vec<Receipt>,
}

impl ReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, draft: ReceiptDraft) -> Result<&Receipt, ReceiptError> {
        let receipt = draft.into_receipt()?;
        self.receipts.push(receipt);
        Ok(&self.receipts[self.receipts.len() - 1])
    }

    pub fn all(&self) -> &[Receipt] {
        &self.receipts
    }
}

/// Delay before a reminder fires. Fractions are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReminderDelay {
    pub days: f64,
    pub hours: f64,
    pub minutes: f64,
}

impl ReminderDelay {
    /// Parse form fields; anything that is not a number counts as zero.
    pub fn parse(days: &str, hours: &str, minutes: &str) -> Self {
        Self {
            days: parse_or_zero(days),
            hours: parse_or_zero(hours),
            minutes: parse_or_zero(minutes),
        }
    }

    pub fn total_millis(&self) -> f64 {
        self.days * MS_PER_DAY + self.hours * MS_PER_HOUR + self.minutes * MS_PER_MINUTE
    }

    /// Human summary, e.g. "Your reminder will pop up in 1 day, 2 hours."
    ///
    /// Only positive parts are named.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = [
            (self.days, "day"),
            (self.hours, "hour"),
            (self.minutes, "minute"),
        ]
        .iter()
        .filter(|(value, _)| *value > 0.0)
        .map(|(value, unit)| {
            let plural = if *value > 1.0 { "s" } else { "" };
            format!("{} {}{}", value, unit, plural)
        })
        .collect();

        if parts.is_empty() {
            return "No reminder set.".to_string();
        }
        format!("Your reminder will pop up in {}.", parts.join(", "))
    }
}

fn parse_or_zero(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Everything needed to post one reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderPlan {
    pub receipt_id: Uuid,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub channel_id: String,
    /// Confirmation shown to the user once scheduled.
    pub summary: String,
}

/// Work out when and what to remind about.
///
/// A zero delay means no reminder was requested and yields `None`.
pub fn plan_reminder(
    receipt: &Receipt,
    delay: &ReminderDelay,
    now: DateTime<Utc>,
) -> Result<Option<ReminderPlan>, ReceiptError> {
    let total = delay.total_millis();
    if total == 0.0 {
        return Ok(None);
    }
    if total < 0.0 {
        return Err(ReceiptError::ReminderInPast);
    }

    let fire_at = Duration::try_milliseconds(total.round() as i64)
        .and_then(|delay| now.checked_add_signed(delay))
        .ok_or(ReceiptError::ReminderTooFar)?;
    let body = format!(
        "Hey! It's time to double-check your bank for the transaction titled \"{}\" for ${:.2}. Make sure the amount is accurate!",
        receipt.title, receipt.amount
    );

    Ok(Some(ReminderPlan {
        receipt_id: receipt.id,
        fire_at,
        title: REMINDER_TITLE.to_string(),
        body,
        channel_id: REMINDER_CHANNEL_ID.to_string(),
        summary: delay.summary(),
    }))
}

/// OS-level local notification service.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Schedule a one-shot notification, returning its identifier.
    async fn schedule(&self, plan: &ReminderPlan) -> Result<String, ReceiptError>;
}

/// Plan a reminder and hand it to `scheduler`. Returns the plan when one was
/// scheduled.
pub async fn schedule_reminder(
    scheduler: &dyn NotificationScheduler,
    receipt: &Receipt,
    delay: &ReminderDelay,
    now: DateTime<Utc>,
) -> Result<Option<ReminderPlan>, ReceiptError> {
    let Some(plan) = plan_reminder(receipt, delay, now)? else {
        tracing::debug!(receipt_id = %receipt.id, "no reminder requested");
        return Ok(None);
    };

    let notification_id = scheduler.schedule(&plan).await?;
    tracing::info!(
        receipt_id = %receipt.id,
        %notification_id,
        fire_at = %plan.fire_at,
        "scheduled receipt reminder"
    );
    Ok(Some(plan))
}

/// Scheduler that only records what it was asked to schedule.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<ReminderPlan>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<ReminderPlan> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    async fn schedule(&self, plan: &ReminderPlan) -> Result<String, ReceiptError> {
        let mut scheduled = self.scheduled.lock().unwrap();
        scheduled.push(plan.clone());
        Ok(format!("reminder-{}", scheduled.len()))
    }
}
