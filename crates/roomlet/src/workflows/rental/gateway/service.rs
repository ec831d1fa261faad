use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::super::domain::{Actor, ContractId, ContractStatus, GatewayRef, Payment, PaymentId,
    PaymentStatus};
use super::super::policy;
use super::super::store::{PaymentOutcome, RentalStore, StoreError};
use super::super::RentalError;
use super::signing;

/// Gateway parameter names, fixed by the integration contract.
pub mod params {
    pub const AMOUNT: &str = "pg_amount";
    pub const REF: &str = "pg_ref";
    pub const DESCRIPTION: &str = "pg_desc";
    pub const CLIENT_IP: &str = "pg_client_ip";
    pub const RETURN_URL: &str = "pg_return_url";
    pub const LOCALE: &str = "pg_locale";
    pub const CREATED: &str = "pg_created";
    pub const RESPONSE_CODE: &str = "pg_response_code";
    pub const BANK_REF: &str = "pg_bank_ref";
}

/// Response code the gateway sends for a completed payment.
pub const SUCCESS_CODE: &str = "00";

/// Connection settings for one gateway account.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub secret: String,
    pub return_url: String,
    pub result_page: String,
    pub locale: String,
}

static PAYMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_payment_id(sequence: u64) -> PaymentId {
    PaymentId(format!("pay-{sequence:06}"))
}

/// Millisecond timestamp plus a process-wide sequence: strictly increasing
/// within a process and collision resistant across restarts.
fn next_gateway_ref(sequence: u64) -> GatewayRef {
    let millis = Utc::now().timestamp_millis();
    GatewayRef(format!("{millis}{sequence:06}"))
}

/// A pending payment together with the redirect URL the end user is sent to.
#[derive(Debug, Clone, Serialize)]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub pay_url: String,
}

/// Stored payment state after a callback was applied, flagged when the
/// notification was a replay of one already reconciled.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackOutcome {
    pub payment: Payment,
    pub replayed: bool,
}

/// Creates payment intents, builds signed redirect URLs, and reconciles the
/// gateway's callbacks idempotently. The callback path is stateless: the
/// persisted gateway reference is the only correlation.
pub struct PaymentService<S> {
    store: Arc<S>,
    config: GatewayConfig,
}

impl<S: RentalStore> PaymentService<S> {
    pub fn new(store: Arc<S>, config: GatewayConfig) -> Self {
        Self { store, config }
    }

    /// Client-visible page the callback handler redirects to.
    pub fn result_page(&self) -> &str {
        &self.config.result_page
    }

    /// Create a pending payment for an active contract and return the signed
    /// redirect URL. Never blocks on payment completion; the callback arrives
    /// later as a separate inbound request.
    pub fn initiate(
        &self,
        actor: &Actor,
        contract_id: &ContractId,
        amount: u64,
        note: Option<String>,
        client_ip: Option<String>,
    ) -> Result<InitiatedPayment, RentalError> {
        let contract = self
            .store
            .fetch_contract(contract_id)?
            .ok_or(RentalError::NotFound("contract"))?;
        if contract.status != ContractStatus::Active {
            return Err(RentalError::InvalidTransition);
        }
        if !policy::can_initiate_payment(actor, &contract) {
            return Err(RentalError::NotAuthorized);
        }
        if amount != contract.rent_price {
            return Err(RentalError::Validation(
                "amount does not match the contract rent".to_string(),
            ));
        }
        // The gateway takes the amount in its minor unit; refuse amounts the
        // conversion cannot represent before anything is persisted.
        let minor_amount = amount.checked_mul(100).ok_or_else(|| {
            RentalError::Validation("amount exceeds the gateway's representable range".to_string())
        })?;

        let sequence = PAYMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let payment = Payment {
            id: next_payment_id(sequence),
            contract_id: contract.id.clone(),
            tenant: contract.tenant.clone(),
            amount,
            gateway_ref: next_gateway_ref(sequence),
            status: PaymentStatus::Pending,
            response_code: None,
            bank_ref: None,
            paid_at: None,
        };

        let payment = self
            .store
            .insert_payment(payment)
            .map_err(|err| RentalError::from_store(err, "payment"))?;

        let description =
            note.unwrap_or_else(|| format!("Rent settlement for contract {}", contract.id.0));
        let pay_url = self.build_pay_url(&payment, minor_amount, &description, client_ip);

        info!(
            payment = %payment.id.0,
            gateway_ref = %payment.gateway_ref.0,
            contract = %contract.id.0,
            "payment initiated"
        );

        Ok(InitiatedPayment { payment, pay_url })
    }

    /// Verify and reconcile an inbound gateway notification.
    ///
    /// Signature mismatches mutate nothing and are logged with the raw
    /// payload for audit. Unknown references never create state. Replays of
    /// an already-settled payment return the stored result unchanged.
    pub fn handle_callback(
        &self,
        raw_params: &HashMap<String, String>,
    ) -> Result<CallbackOutcome, RentalError> {
        let provided = raw_params.get(signing::SIGNATURE_PARAM);
        let verified = provided
            .map(|mac| signing::verify(raw_params.iter(), mac, &self.config.secret))
            .unwrap_or(false);
        if !verified {
            warn!(payload = ?raw_params, "gateway callback rejected: signature mismatch");
            return Err(RentalError::GatewayVerification);
        }

        let gateway_ref = raw_params
            .get(params::REF)
            .map(|value| GatewayRef(value.clone()))
            .ok_or_else(|| {
                RentalError::Validation(format!("missing {} parameter", params::REF))
            })?;
        let response_code = raw_params.get(params::RESPONSE_CODE).ok_or_else(|| {
            RentalError::Validation(format!("missing {} parameter", params::RESPONSE_CODE))
        })?;

        let outcome = if response_code == SUCCESS_CODE {
            PaymentOutcome::Success {
                response_code: response_code.clone(),
                bank_ref: raw_params.get(params::BANK_REF).cloned(),
                paid_at: Utc::now(),
            }
        } else {
            PaymentOutcome::Failure {
                response_code: response_code.clone(),
            }
        };

        match self.store.settle_payment(&gateway_ref, outcome) {
            Ok(settlement) => {
                if settlement.replayed {
                    info!(
                        gateway_ref = %gateway_ref.0,
                        status = settlement.payment.status.label(),
                        "duplicate gateway notification ignored"
                    );
                } else {
                    info!(
                        gateway_ref = %gateway_ref.0,
                        status = settlement.payment.status.label(),
                        "payment reconciled"
                    );
                }
                Ok(CallbackOutcome {
                    payment: settlement.payment,
                    replayed: settlement.replayed,
                })
            }
            Err(StoreError::NotFound) => {
                warn!(gateway_ref = %gateway_ref.0, "callback for unknown gateway reference");
                Err(RentalError::NotFound("payment"))
            }
            Err(other) => Err(RentalError::from_store(other, "payment")),
        }
    }

    /// Read-only settlement state, restricted to the owning tenant or an
    /// admin.
    pub fn query_result(
        &self,
        actor: &Actor,
        gateway_ref: &GatewayRef,
    ) -> Result<Payment, RentalError> {
        let payment = self
            .store
            .fetch_payment(gateway_ref)?
            .ok_or(RentalError::NotFound("payment"))?;
        if !policy::can_view_payment(actor, &payment) {
            return Err(RentalError::NotAuthorized);
        }
        Ok(payment)
    }

    fn build_pay_url(
        &self,
        payment: &Payment,
        minor_amount: u64,
        description: &str,
        client_ip: Option<String>,
    ) -> String {
        let mut fields = BTreeMap::new();
        fields.insert(params::AMOUNT.to_string(), minor_amount.to_string());
        fields.insert(params::REF.to_string(), payment.gateway_ref.0.clone());
        fields.insert(params::DESCRIPTION.to_string(), description.to_string());
        fields.insert(
            params::CLIENT_IP.to_string(),
            client_ip.unwrap_or_else(|| "127.0.0.1".to_string()),
        );
        fields.insert(
            params::RETURN_URL.to_string(),
            self.config.return_url.clone(),
        );
        fields.insert(params::LOCALE.to_string(), self.config.locale.clone());
        fields.insert(
            params::CREATED.to_string(),
            Utc::now().format("%Y%m%d%H%M%S").to_string(),
        );

        let canonical = signing::canonical_query(&fields);
        let mac = signing::sign(&canonical, &self.config.secret);
        format!(
            "{}?{}&{}={}",
            self.config.endpoint,
            canonical,
            signing::SIGNATURE_PARAM,
            mac
        )
    }
}
