use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::{
    Collection, Database,
    bson::{doc, oid::ObjectId},
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};
use crate::models::otp::OtpRecord;

pub const OTP_TTL_MINUTES: i64 = 15;
pub const MAX_ATTEMPTS: i32 = 5;
/// Token minted after a successful code exchange.
pub const MEMBER_TOKEN_TTL_MINUTES: i64 = 60;
/// Magic-link tokens are shorter-lived: the link sits in an inbox.
pub const MAGIC_LINK_TTL_MINUTES: i64 = 15;

/// Claims carried by a minted member bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemberClaims {
    pub sub: String,
    pub member_id: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug)]
pub struct VerifiedMember {
    pub token: String,
    pub application_id: ObjectId,
    pub member_id: String,
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// Uniform over 100000..=999999, always six digits.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(100_000..=999_999).to_string()
}

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    Expired,
    Mismatch,
}

/// Decides the fate of one verification attempt. Expiry wins over mismatch
/// so the client can distinguish "request a fresh code" from "retype it".
pub fn evaluate(record: &OtpRecord, submitted: &str, now: DateTime<Utc>) -> VerifyOutcome {
    if now >= record.expires_at {
        VerifyOutcome::Expired
    } else if record.code == submitted.trim() {
        VerifyOutcome::Valid
    } else {
        VerifyOutcome::Mismatch
    }
}

/// HS256 bearer token with a member-level role claim.
pub fn mint_member_token(
    jwt_secret: &str,
    application_id: &ObjectId,
    member_id: &str,
    ttl_minutes: i64,
) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::minutes(ttl_minutes))
        .ok_or_else(|| AppError::internal("Failed to calculate expiration"))?
        .timestamp() as usize;

    let claims = MemberClaims {
        sub: application_id.to_hex(),
        member_id: member_id.to_string(),
        role: "member".to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("Token generation failed: {}", e)))
}

/// Record persistence seam, so the verification state machine can be
/// exercised against an in-memory store in tests.
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn get(&self, email: &str) -> Result<Option<OtpRecord>>;
    async fn put(&self, record: &OtpRecord) -> Result<()>;
    async fn delete(&self, email: &str) -> Result<()>;
    async fn increment_attempts(&self, email: &str) -> Result<()>;
}

pub struct MongoOtpStore {
    db: Database,
}

impl MongoOtpStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<OtpRecord> {
        self.db.collection("otp_codes")
    }
}

#[async_trait]
impl OtpStore for MongoOtpStore {
    async fn get(&self, email: &str) -> Result<Option<OtpRecord>> {
        Ok(self.collection().find_one(doc! { "_id": email }).await?)
    }

    async fn put(&self, record: &OtpRecord) -> Result<()> {
        self.collection()
            .replace_one(doc! { "_id": &record.email }, record)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn delete(&self, email: &str) -> Result<()> {
        self.collection().delete_one(doc! { "_id": email }).await?;
        Ok(())
    }

    async fn increment_attempts(&self, email: &str) -> Result<()> {
        self.collection()
            .update_one(doc! { "_id": email }, doc! { "$inc": { "attempts": 1 } })
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    jwt_secret: String,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, jwt_secret: String) -> Self {
        Self { store, jwt_secret }
    }

    /// Upserts the OTP record for `email` (already normalized). Any prior
    /// pending code for the address is overwritten; only the latest code is
    /// ever valid.
    pub async fn issue(
        &self,
        email: &str,
        application_id: ObjectId,
        member_id: &str,
    ) -> Result<OtpRecord> {
        let now = Utc::now();
        let record = OtpRecord {
            email: email.to_string(),
            code: generate_code(),
            attempts: 0,
            application_id,
            member_id: member_id.to_string(),
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            created_at: now,
        };

        self.store.put(&record).await?;

        Ok(record)
    }

    /// Single-use verification: a matching code mints a member token and
    /// deletes the record; a mismatch leaves it in place (attempts + 1)
    /// until the lockout threshold.
    pub async fn verify(&self, email: &str, submitted: &str) -> Result<VerifiedMember> {
        let record = self
            .store
            .get(email)
            .await?
            .ok_or(AppError::NotFound("Verification code"))?;

        match evaluate(&record, submitted, Utc::now()) {
            VerifyOutcome::Expired => {
                Err(AppError::FailedPrecondition("Code expired, request a new one"))
            }
            VerifyOutcome::Mismatch => {
                if record.attempts + 1 >= MAX_ATTEMPTS {
                    self.store.delete(email).await?;
                    return Err(AppError::FailedPrecondition(
                        "Too many attempts, request a new code",
                    ));
                }
                self.store.increment_attempts(email).await?;
                Err(AppError::PermissionDenied("Invalid code"))
            }
            VerifyOutcome::Valid => {
                let token = mint_member_token(
                    &self.jwt_secret,
                    &record.application_id,
                    &record.member_id,
                    MEMBER_TOKEN_TTL_MINUTES,
                )?;

                self.store.delete(email).await?;

                Ok(VerifiedMember {
                    token,
                    application_id: record.application_id,
                    member_id: record.member_id,
                })
            }
        }
    }

    pub fn mint_member_token(
        &self,
        application_id: &ObjectId,
        member_id: &str,
        ttl_minutes: i64,
    ) -> Result<String> {
        mint_member_token(&self.jwt_secret, application_id, member_id, ttl_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn record(code: &str, expires_in_min: i64, attempts: i32) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            email: "jane@x.com".to_string(),
            code: code.to_string(),
            attempts,
            application_id: ObjectId::new(),
            member_id: "FP-0001".to_string(),
            expires_at: now + Duration::minutes(expires_in_min),
            created_at: now,
        }
    }

    #[test]
    fn generated_codes_are_six_digits_in_range() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn normalization_trims_and_lowercases() {
        assert_eq!(normalize_email("  Jane@X.com "), "jane@x.com");
        assert_eq!(normalize_email("jane@x.com"), "jane@x.com");
    }

    #[test]
    fn matching_code_before_expiry_is_valid() {
        let r = record("123456", 15, 0);
        assert_eq!(evaluate(&r, "123456", Utc::now()), VerifyOutcome::Valid);
    }

    #[test]
    fn submitted_code_is_trimmed_before_comparison() {
        let r = record("123456", 15, 0);
        assert_eq!(evaluate(&r, " 123456 ", Utc::now()), VerifyOutcome::Valid);
    }

    #[test]
    fn correct_code_after_expiry_is_expired_not_mismatch() {
        let r = record("123456", -1, 0);
        assert_eq!(evaluate(&r, "123456", Utc::now()), VerifyOutcome::Expired);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let r = record("123456", 0, 0);
        assert_eq!(evaluate(&r, "123456", r.expires_at), VerifyOutcome::Expired);
    }

    #[test]
    fn wrong_code_before_expiry_is_mismatch() {
        let r = record("123456", 15, 0);
        assert_eq!(evaluate(&r, "654321", Utc::now()), VerifyOutcome::Mismatch);
    }

    fn decoded_ttl_secs(token: &str) -> i64 {
        let data = decode::<MemberClaims>(
            token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        data.claims.exp as i64 - Utc::now().timestamp()
    }

    #[test]
    fn magic_link_tokens_expire_in_fifteen_minutes() {
        let token =
            mint_member_token("secret", &ObjectId::new(), "FP-0001", MAGIC_LINK_TTL_MINUTES)
                .unwrap();
        let ttl = decoded_ttl_secs(&token);
        assert!(
            ttl > 14 * 60 && ttl <= MAGIC_LINK_TTL_MINUTES * 60,
            "magic-link token ttl was {} secs",
            ttl
        );
    }

    #[test]
    fn verify_tokens_expire_in_sixty_minutes() {
        let token =
            mint_member_token("secret", &ObjectId::new(), "FP-0001", MEMBER_TOKEN_TTL_MINUTES)
                .unwrap();
        let ttl = decoded_ttl_secs(&token);
        assert!(
            ttl > 59 * 60 && ttl <= MEMBER_TOKEN_TTL_MINUTES * 60,
            "member token ttl was {} secs",
            ttl
        );
    }

    #[derive(Default)]
    struct MemoryOtpStore {
        records: Mutex<HashMap<String, OtpRecord>>,
    }

    #[async_trait]
    impl OtpStore for MemoryOtpStore {
        async fn get(&self, email: &str) -> Result<Option<OtpRecord>> {
            Ok(self.records.lock().unwrap().get(email).cloned())
        }

        async fn put(&self, record: &OtpRecord) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.email.clone(), record.clone());
            Ok(())
        }

        async fn delete(&self, email: &str) -> Result<()> {
            self.records.lock().unwrap().remove(email);
            Ok(())
        }

        async fn increment_attempts(&self, email: &str) -> Result<()> {
            if let Some(r) = self.records.lock().unwrap().get_mut(email) {
                r.attempts += 1;
            }
            Ok(())
        }
    }

    fn service() -> (OtpService, Arc<MemoryOtpStore>) {
        let store = Arc::new(MemoryOtpStore::default());
        (
            OtpService::new(store.clone(), "secret".to_string()),
            store,
        )
    }

    #[tokio::test]
    async fn issued_code_verifies_exactly_once() {
        let (svc, store) = service();
        let issued = svc.issue("jane@x.com", ObjectId::new(), "FP-0001").await.unwrap();

        let verified = svc.verify("jane@x.com", &issued.code).await.unwrap();
        assert_eq!(verified.member_id, "FP-0001");
        assert!(!verified.token.is_empty());
        assert!(store.records.lock().unwrap().is_empty());

        // Record deleted: the same code is gone, not merely invalid.
        let second = svc.verify("jane@x.com", &issued.code).await;
        assert!(matches!(second, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn reissue_invalidates_the_previous_code() {
        let (svc, _store) = service();
        let first = svc.issue("jane@x.com", ObjectId::new(), "FP-0001").await.unwrap();
        let second = svc.issue("jane@x.com", ObjectId::new(), "FP-0001").await.unwrap();

        if first.code != second.code {
            let result = svc.verify("jane@x.com", &first.code).await;
            assert!(matches!(result, Err(AppError::PermissionDenied(_))));
        }
        svc.verify("jane@x.com", &second.code).await.unwrap();
    }

    #[tokio::test]
    async fn mismatches_keep_the_record_until_the_fifth_locks_out() {
        let (svc, store) = service();
        let issued = svc.issue("jane@x.com", ObjectId::new(), "FP-0001").await.unwrap();
        let wrong = if issued.code == "000000" { "111111" } else { "000000" };

        for attempt in 1..MAX_ATTEMPTS {
            let result = svc.verify("jane@x.com", wrong).await;
            assert!(matches!(result, Err(AppError::PermissionDenied(_))));
            let records = store.records.lock().unwrap();
            let record = records.get("jane@x.com").expect("record kept");
            assert_eq!(record.attempts, attempt);
        }

        let locked = svc.verify("jane@x.com", wrong).await;
        assert!(matches!(locked, Err(AppError::FailedPrecondition(_))));
        assert!(store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_record_rejects_even_the_right_code() {
        let (svc, store) = service();
        let mut stale = record("123456", -1, 0);
        stale.email = "jane@x.com".to_string();
        store.put(&stale).await.unwrap();

        let result = svc.verify("jane@x.com", "123456").await;
        assert!(matches!(result, Err(AppError::FailedPrecondition(_))));
    }
}
