//! Mock deposit and withdrawal flows
//!
//! Nothing leaves the process: a PIX payment gets a synthetic copy-paste
//! code and a card payment is only shape-checked. Completing a payment
//! credits or debits the ledger without creating a bet record.

use crate::config::PaymentsConfig;
use crate::errors::{FieldErrors, HeyBetResult, ValidationError};
use crate::ledger::Ledger;
use crate::rng::RandomSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use uuid::Uuid;

/// Processing fee shown to card payers, informational only
pub const CARD_FEE_RATE: f64 = 0.035;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Deposit,
    Withdraw,
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentKind::Deposit => write!(f, "deposit"),
            PaymentKind::Withdraw => write!(f, "withdraw"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub holder: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentMethod {
    Pix,
    Card(CardDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRequest {
    pub kind: PaymentKind,
    pub amount: f64,
    #[serde(flatten)]
    pub method: PaymentMethod,
}

/// A validated payment, ready to complete
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: String,
    pub kind: PaymentKind,
    pub amount: f64,
    pub pix_code: Option<String>,
    /// Last four card digits
    pub card_last4: Option<String>,
    /// Amount plus the card fee; equals `amount` for PIX
    pub charged: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub balance_before: f64,
    pub balance_after: f64,
}

pub struct PaymentDesk {
    config: PaymentsConfig,
}

impl PaymentDesk {
    pub fn new(config: PaymentsConfig) -> Self {
        Self { config }
    }

    /// Amount limits: deposits within the configured range, withdrawals
    /// above the minimum and covered by the balance
    pub fn validate_amount(&self, kind: PaymentKind, amount: f64, balance: f64) -> Result<(), ValidationError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::InvalidStake(amount));
        }

        match kind {
            PaymentKind::Deposit => {
                if amount < self.config.min_deposit || amount > self.config.max_deposit {
                    return Err(ValidationError::AmountOutOfRange {
                        amount,
                        min: self.config.min_deposit,
                        max: self.config.max_deposit,
                    });
                }
            }
            PaymentKind::Withdraw => {
                if amount < self.config.min_withdraw {
                    return Err(ValidationError::AmountOutOfRange {
                        amount,
                        min: self.config.min_withdraw,
                        max: balance,
                    });
                }
                if amount > balance {
                    return Err(ValidationError::InsufficientFunds {
                        requested: amount,
                        balance,
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate a request against the current balance and build the payment
    pub fn prepare(
        &self,
        request: &PaymentRequest,
        balance: f64,
        rng: &mut impl RandomSource,
    ) -> HeyBetResult<Payment> {
        self.validate_amount(request.kind, request.amount, balance)?;

        let created_at = Utc::now();
        let (pix_code, card_last4, charged) = match &request.method {
            PaymentMethod::Pix => (
                Some(pix_code(created_at.timestamp_millis(), rng)),
                None,
                request.amount,
            ),
            PaymentMethod::Card(card) => {
                validate_card(card)?;
                let digits = digits(&card.number);
                let last4 = digits[digits.len() - 4..].to_string();
                (None, Some(last4), request.amount * (1.0 + CARD_FEE_RATE))
            }
        };

        Ok(Payment {
            id: Uuid::new_v4().to_string(),
            kind: request.kind,
            amount: request.amount,
            pix_code,
            card_last4,
            charged,
            created_at,
        })
    }

    /// Apply a prepared payment; the amount is re-checked against the live balance
    pub fn complete(&self, payment: Payment, ledger: &mut Ledger) -> HeyBetResult<PaymentReceipt> {
        self.complete_holding(payment, ledger, 0.0)
    }

    /// Apply a prepared payment while `held` of the balance backs open rounds.
    /// Withdrawals may only draw on what is left.
    pub fn complete_holding(&self, payment: Payment, ledger: &mut Ledger, held: f64) -> HeyBetResult<PaymentReceipt> {
        let balance_before = ledger.balance();
        self.validate_amount(payment.kind, payment.amount, balance_before - held)?;

        let balance_after = match payment.kind {
            PaymentKind::Deposit => ledger.deposit(payment.amount)?,
            PaymentKind::Withdraw => ledger.withdraw(payment.amount)?,
        };

        info!(
            payment_id = %payment.id,
            kind = %payment.kind,
            amount = payment.amount,
            balance = balance_after,
            "Payment completed"
        );

        Ok(PaymentReceipt {
            payment,
            balance_before,
            balance_after,
        })
    }
}

impl Default for PaymentDesk {
    fn default() -> Self {
        Self::new(PaymentsConfig::default())
    }
}

/// Synthetic PIX copy-paste code stamped with `millis`
pub fn pix_code(millis: i64, rng: &mut impl RandomSource) -> String {
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.below(BASE36.len())] as char)
        .collect();
    format!(
        "00020126580014BR.GOV.BCB.PIX0136{}5204000053039865802BR5925HEY BET PAGAMENTOS LTDA6009SAO PAULO62070503***6304{}",
        millis, suffix
    )
}

pub fn validate_card(card: &CardDetails) -> Result<(), ValidationError> {
    let mut errors = FieldErrors::new();

    let number = digits(&card.number);
    let only_digits = card
        .number
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace());
    if !only_digits || number.len() < 13 || number.len() > 19 {
        errors.add("number", "Card number must have 13 to 19 digits");
    }

    if card.holder.trim().is_empty() {
        errors.add("holder", "Card holder name is required");
    }

    if !is_valid_expiry(&card.expiry) {
        errors.add("expiry", "Expiry must be MM/YY");
    }

    let cvv_ok = (3..=4).contains(&card.cvv.len()) && card.cvv.chars().all(|c| c.is_ascii_digit());
    if !cvv_ok {
        errors.add("cvv", "CVV must have 3 or 4 digits");
    }

    errors.into_result()
}

fn is_valid_expiry(expiry: &str) -> bool {
    let Some((month, year)) = expiry.split_once('/') else {
        return false;
    };
    let two_digits = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_digit());
    if !two_digits(month) || !two_digits(year) {
        return false;
    }
    matches!(month.parse::<u32>(), Ok(1..=12))
}

fn digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Group card digits by four: `4111 1111 1111 1111`
pub fn format_card_number(input: &str) -> String {
    let digits = digits(input);
    let mut out = String::with_capacity(digits.len() + digits.len() / 4);
    for (i, c) in digits.chars().take(19).enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// `1225` becomes `12/25`
pub fn format_expiry(input: &str) -> String {
    let digits = digits(input);
    let formatted = if digits.len() > 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    };
    formatted.chars().take(5).collect()
}
