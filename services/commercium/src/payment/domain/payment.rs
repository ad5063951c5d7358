//! 支付聚合

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use commercium_common::{OrderId, PaymentId};
use commercium_domain_core::{AggregateRoot, Decimal, Entity, ensure_non_negative, ensure_positive};
use commercium_errors::{AppError, AppResult};
use commercium_event_core::PendingEvents;
use serde::{Deserialize, Serialize};

use super::events::{PaymentCancelled, PaymentCompleted, PaymentEvent, PaymentFailed};

/// 支付方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    VirtualAccount,
    Mobile,
    Point,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "CARD",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::VirtualAccount => "VIRTUAL_ACCOUNT",
            Self::Mobile => "MOBILE",
            Self::Point => "POINT",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Card => "신용카드",
            Self::BankTransfer => "계좌이체",
            Self::VirtualAccount => "가상계좌",
            Self::Mobile => "휴대폰",
            Self::Point => "포인트",
        }
    }

    /// 结果经由 PG 回调通知
    pub fn requires_callback(&self) -> bool {
        matches!(self, Self::VirtualAccount | Self::BankTransfer)
    }

    pub fn is_real_time(&self) -> bool {
        matches!(self, Self::Card | Self::Mobile)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CARD" => Ok(Self::Card),
            "BANK_TRANSFER" => Ok(Self::BankTransfer),
            "VIRTUAL_ACCOUNT" => Ok(Self::VirtualAccount),
            "MOBILE" => Ok(Self::Mobile),
            "POINT" => Ok(Self::Point),
            other => Err(AppError::validation(format!("Unknown payment method: {}", other))),
        }
    }
}

/// 支付状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    PartialCancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::PartialCancelled => "PARTIAL_CANCELLED",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Pending => "결제대기",
            Self::Processing => "결제처리중",
            Self::Completed => "결제완료",
            Self::Failed => "결제실패",
            Self::Cancelled => "결제취소",
            Self::PartialCancelled => "부분취소",
        }
    }

    pub fn is_completable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            "PARTIAL_CANCELLED" => Ok(Self::PartialCancelled),
            other => Err(AppError::validation(format!("Unknown payment status: {}", other))),
        }
    }
}

/// 支付金额：总额 / 实付 / 已取消
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAmount {
    pub total: Decimal,
    pub paid: Decimal,
    pub cancelled: Decimal,
}

impl PaymentAmount {
    pub fn of(total: Decimal) -> AppResult<Self> {
        ensure_non_negative(total, "금액")?;
        Ok(Self {
            total,
            paid: Decimal::ZERO,
            cancelled: Decimal::ZERO,
        })
    }

    pub fn mark_as_paid(self, paid: Decimal) -> AppResult<Self> {
        ensure_non_negative(paid, "금액")?;
        if paid > self.total {
            return Err(AppError::validation("결제 금액이 총 금액을 초과할 수 없습니다"));
        }
        Ok(Self { paid, ..self })
    }

    /// 累计取消额不得超过实付额
    pub fn cancel(self, amount: Decimal) -> AppResult<Self> {
        ensure_non_negative(amount, "금액")?;
        let cancelled = self.cancelled + amount;
        if cancelled > self.paid {
            return Err(AppError::validation("취소 금액이 결제 금액을 초과할 수 없습니다"));
        }
        Ok(Self { cancelled, ..self })
    }

    pub fn refundable(&self) -> Decimal {
        self.paid - self.cancelled
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid == self.total
    }

    pub fn is_fully_cancelled(&self) -> bool {
        self.cancelled == self.paid && self.paid > Decimal::ZERO
    }
}

/// PG 服务商信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProvider {
    pub name: String,
    pub external_payment_id: Option<String>,
    pub transaction_id: Option<String>,
}

impl PaymentProvider {
    pub fn of(
        name: impl Into<String>,
        external_payment_id: Option<String>,
        transaction_id: Option<String>,
    ) -> AppResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::validation("결제 대행사명은 필수입니다"));
        }
        Ok(Self {
            name,
            external_payment_id,
            transaction_id,
        })
    }
}

/// 支付聚合根
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub amount: PaymentAmount,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    pub failed_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    events: PendingEvents<PaymentEvent>,
}

impl Payment {
    pub fn create(
        order_id: OrderId,
        method: PaymentMethod,
        total: Decimal,
        provider_name: &str,
    ) -> AppResult<Self> {
        ensure_positive(total, "결제 금액")?;

        let now = Utc::now();
        Ok(Self {
            id: PaymentId::new(),
            order_id,
            method,
            amount: PaymentAmount::of(total)?,
            provider: PaymentProvider::of(provider_name, None, None)?,
            status: PaymentStatus::Pending,
            failed_reason: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            events: PendingEvents::default(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: PaymentId,
        order_id: OrderId,
        method: PaymentMethod,
        amount: PaymentAmount,
        provider: PaymentProvider,
        status: PaymentStatus,
        failed_reason: Option<String>,
        paid_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            method,
            amount,
            provider,
            status,
            failed_reason,
            paid_at,
            created_at,
            updated_at,
            events: PendingEvents::default(),
        }
    }

    pub fn start_processing(&mut self, external_payment_id: String, transaction_id: String) -> AppResult<()> {
        if !self.status.is_completable() {
            return Err(self.illegal("처리를 시작할"));
        }

        self.status = PaymentStatus::Processing;
        self.provider = PaymentProvider::of(
            self.provider.name.clone(),
            Some(external_payment_id),
            Some(transaction_id),
        )?;
        self.touch();
        Ok(())
    }

    pub fn complete(&mut self, paid: Decimal) -> AppResult<()> {
        if !self.status.is_completable() {
            return Err(self.illegal("완료 처리할"));
        }

        self.amount = self.amount.mark_as_paid(paid)?;
        self.status = PaymentStatus::Completed;
        self.paid_at = Some(Utc::now());
        self.touch();

        self.events.record(PaymentEvent::Completed(PaymentCompleted {
            payment_id: self.id,
            order_id: self.order_id,
            payment_method: self.method,
            paid_amount: paid,
        }));
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> AppResult<()> {
        if self.status.is_final() {
            return Err(self.illegal("실패 처리할"));
        }

        let reason = reason.into();
        self.status = PaymentStatus::Failed;
        self.failed_reason = Some(reason.clone());
        self.touch();

        self.events.record(PaymentEvent::Failed(PaymentFailed {
            payment_id: self.id,
            order_id: self.order_id,
            failure_reason: reason,
        }));
        Ok(())
    }

    pub fn cancel(&mut self, amount: Decimal, reason: impl Into<String>) -> AppResult<()> {
        if !self.status.is_cancellable() {
            return Err(self.illegal("취소할"));
        }

        self.amount = self.amount.cancel(amount)?;
        self.status = if self.amount.is_fully_cancelled() {
            PaymentStatus::Cancelled
        } else {
            PaymentStatus::PartialCancelled
        };
        self.touch();

        self.events.record(PaymentEvent::Cancelled(PaymentCancelled {
            payment_id: self.id,
            order_id: self.order_id,
            cancelled_amount: amount,
            reason: reason.into(),
        }));
        Ok(())
    }

    pub fn can_cancel(&self) -> bool {
        self.status.is_cancellable() && self.amount.refundable() > Decimal::ZERO
    }

    pub fn is_successful(&self) -> bool {
        self.status == PaymentStatus::Completed && self.amount.is_fully_paid()
    }

    fn illegal(&self, action: &str) -> AppError {
        AppError::invalid_state(format!(
            "결제 상태가 {}인 경우 {} 수 없습니다",
            self.status.description(),
            action
        ))
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Payment {
    type Event = PaymentEvent;

    fn pending_events(&mut self) -> &mut PendingEvents<Self::Event> {
        &mut self.events
    }
}
