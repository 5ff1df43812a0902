//! Entitlement to a specific product and its lifecycle state machine.
//!
//! Transition table (see component design for the full rationale):
//!
//! | From \ Event | renew | suspend | resume | cancel | expire-sweep |
//! |---|---|---|---|---|---|
//! | valid     | valid (new expiry)     | suspended | error      | cancelled | expired (iff expired) |
//! | suspended | suspended (new expiry) | error     | valid      | cancelled | expired |
//! | cancelled | error                  | error     | error      | error     | — |
//! | expired   | valid (new expiry)     | error     | error      | cancelled | — |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LicenseError, LicenseResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Valid,
    Suspended,
    Cancelled,
    Expired,
}

impl std::fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LicenseStatus::Valid => "valid",
            LicenseStatus::Suspended => "suspended",
            LicenseStatus::Cancelled => "cancelled",
            LicenseStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for LicenseStatus {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid" => Ok(LicenseStatus::Valid),
            "suspended" => Ok(LicenseStatus::Suspended),
            "cancelled" => Ok(LicenseStatus::Cancelled),
            "expired" => Ok(LicenseStatus::Expired),
            other => Err(LicenseError::Internal(format!("unknown license status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: Uuid,
    pub license_key_id: Uuid,
    pub product_id: Uuid,
    pub status: LicenseStatus,
    pub seat_limit: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl License {
    pub fn create(
        license_key_id: Uuid,
        product_id: Uuid,
        seat_limit: u32,
        expires_at: Option<DateTime<Utc>>,
    ) -> LicenseResult<Self> {
        if seat_limit < 1 {
            return Err(LicenseError::Validation("seat_limit must be >= 1".to_string()));
        }
        if let Some(exp) = expires_at {
            if exp <= Utc::now() {
                return Err(LicenseError::InvalidExpiration(
                    "expiration_date must be in the future".to_string(),
                ));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            license_key_id,
            product_id,
            status: LicenseStatus::Valid,
            seat_limit,
            expires_at,
            created_at: now,
            updated_at: now,
        })
    }

    /// True iff `status == valid` and not expired. Per the resolved open question,
    /// `expires_at <= now` counts as not valid.
    pub fn is_valid(&self) -> bool {
        self.status == LicenseStatus::Valid
            && self.expires_at.map_or(true, |exp| exp > Utc::now())
    }

    /// Checks the license's gating status for activation, returning the specific error the
    /// caller should surface rather than a generic "invalid" flag.
    pub fn check_activatable(&self) -> LicenseResult<()> {
        match self.status {
            LicenseStatus::Suspended => Err(LicenseError::LicenseSuspended),
            LicenseStatus::Cancelled => Err(LicenseError::LicenseCancelled),
            LicenseStatus::Expired => Err(LicenseError::LicenseExpired),
            LicenseStatus::Valid => {
                if self.expires_at.is_some_and(|exp| exp <= Utc::now()) {
                    Err(LicenseError::LicenseExpired)
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn renew(&mut self, new_expires_at: Option<DateTime<Utc>>) -> LicenseResult<()> {
        match self.status {
            LicenseStatus::Cancelled => Err(LicenseError::InvalidLicenseStatus(
                "cannot renew a cancelled license".to_string(),
            )),
            LicenseStatus::Valid | LicenseStatus::Suspended | LicenseStatus::Expired => {
                if let Some(exp) = new_expires_at {
                    if exp <= Utc::now() {
                        return Err(LicenseError::InvalidExpiration(
                            "new expiration must be in the future".to_string(),
                        ));
                    }
                }
                self.expires_at = new_expires_at;
                if self.status == LicenseStatus::Expired {
                    self.status = LicenseStatus::Valid;
                }
                self.updated_at = Utc::now();
                Ok(())
            }
        }
    }

    pub fn suspend(&mut self) -> LicenseResult<()> {
        match self.status {
            LicenseStatus::Valid => {
                self.status = LicenseStatus::Suspended;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(LicenseError::InvalidLicenseStatus(format!(
                "cannot suspend a license in status '{}'",
                self.status
            ))),
        }
    }

    pub fn resume(&mut self) -> LicenseResult<()> {
        match self.status {
            LicenseStatus::Suspended => {
                self.status = LicenseStatus::Valid;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(LicenseError::InvalidLicenseStatus(format!(
                "cannot resume a license in status '{}'",
                self.status
            ))),
        }
    }

    pub fn cancel(&mut self) -> LicenseResult<()> {
        match self.status {
            LicenseStatus::Cancelled => Err(LicenseError::InvalidLicenseStatus(
                "license is already cancelled".to_string(),
            )),
            _ => {
                self.status = LicenseStatus::Cancelled;
                self.updated_at = Utc::now();
                Ok(())
            }
        }
    }

    /// Used only by the periodic expirer; moves `valid` -> `expired` when `expires_at < now`.
    /// No-op (returns false) on any other status or if not yet expired.
    pub fn mark_expired(&mut self) -> bool {
        if self.status == LicenseStatus::Valid && self.expires_at.is_some_and(|exp| exp < Utc::now()) {
            self.status = LicenseStatus::Expired;
            self.updated_at = Utc::now();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn future(secs: i64) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(secs)
    }

    fn past(secs: i64) -> DateTime<Utc> {
        Utc::now() - Duration::seconds(secs)
    }

    #[test]
    fn create_defaults_to_valid() {
        let license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap();
        assert_eq!(license.status, LicenseStatus::Valid);
        assert!(license.is_valid());
    }

    #[test]
    fn create_rejects_zero_seats() {
        assert!(License::create(Uuid::new_v4(), Uuid::new_v4(), 0, None).is_err());
    }

    #[test]
    fn create_rejects_past_expiration() {
        assert!(License::create(Uuid::new_v4(), Uuid::new_v4(), 1, Some(past(10))).is_err());
    }

    #[test]
    fn expires_at_equal_now_counts_as_invalid() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, Some(future(5))).unwrap();
        license.expires_at = Some(Utc::now());
        assert!(!license.is_valid());
    }

    #[test]
    fn renew_requires_future_date() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap();
        assert!(license.renew(Some(past(1))).is_err());
        assert!(license.renew(Some(future(100))).is_ok());
    }

    #[test]
    fn renew_from_expired_returns_to_valid() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, Some(future(1))).unwrap();
        license.expires_at = Some(past(1));
        assert!(license.mark_expired());
        assert_eq!(license.status, LicenseStatus::Expired);
        license.renew(Some(future(30))).unwrap();
        assert_eq!(license.status, LicenseStatus::Valid);
    }

    #[test]
    fn renew_rejects_from_cancelled() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap();
        license.cancel().unwrap();
        assert!(license.renew(Some(future(30))).is_err());
    }

    #[test]
    fn suspend_then_resume() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap();
        license.suspend().unwrap();
        assert_eq!(license.status, LicenseStatus::Suspended);
        assert!(!license.is_valid());
        license.resume().unwrap();
        assert_eq!(license.status, LicenseStatus::Valid);
    }

    #[test]
    fn suspend_from_cancelled_fails() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap();
        license.cancel().unwrap();
        assert!(license.suspend().is_err());
    }

    #[test]
    fn resume_only_from_suspended() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap();
        assert!(license.resume().is_err());
    }

    #[test]
    fn cancel_is_terminal() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap();
        license.cancel().unwrap();
        assert!(license.cancel().is_err());
        assert!(license.suspend().is_err());
        assert!(license.resume().is_err());
        assert!(license.renew(Some(future(10))).is_err());
    }

    #[test]
    fn mark_expired_only_from_valid_and_past_expiry() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, Some(future(1))).unwrap();
        assert!(!license.mark_expired()); // not yet expired
        license.expires_at = Some(past(1));
        assert!(license.mark_expired());
        assert_eq!(license.status, LicenseStatus::Expired);
        assert!(!license.mark_expired()); // idempotent no-op second time
    }

    #[test]
    fn check_activatable_reports_specific_reasons() {
        let mut license = License::create(Uuid::new_v4(), Uuid::new_v4(), 1, None).unwrap();
        assert!(license.check_activatable().is_ok());
        license.suspend().unwrap();
        assert!(matches!(
            license.check_activatable(),
            Err(LicenseError::LicenseSuspended)
        ));
    }
}
