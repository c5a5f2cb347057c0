//! Credential environments and the compartment-name rule that selects them.
//!
//! Buckets live in compartments whose names end in an environment suffix
//! (`-dev` or `-prd`), and each environment has its own API user. This module
//! provides the [`Environment`] tag, the pure suffix classification, and the
//! immutable [`CredentialRegistry`] that [`resolve`](CredentialRegistry::resolve)s
//! a compartment name to the credentials that must sign requests touching it.
//!
//! There is no "currently active" credential anywhere: callers resolve a
//! [`CredentialSet`] per request and pass it along, so concurrent requests for
//! different environments cannot observe each other.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;
use crate::keys::KeySource;

/// The deployment environments credentials can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Development compartments, suffix `-dev`.
    Dev,
    /// Production compartments, suffix `-prd`.
    Prd,
}

impl Environment {
    /// Classify a compartment name by its environment suffix.
    ///
    /// Matching is case-insensitive on the trimmed name: `-dev` selects
    /// [`Environment::Dev`], `-prd` selects [`Environment::Prd`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnresolvedEnvironment`] when the name carries
    /// neither suffix. There is no default environment.
    ///
    /// # Examples
    ///
    /// ```
    /// use stowage_auth::Environment;
    ///
    /// assert_eq!(
    ///     Environment::classify("cp-infra-ddw3-dev").unwrap(),
    ///     Environment::Dev
    /// );
    /// assert!(Environment::classify("cp-infra-ddw3").is_err());
    /// ```
    pub fn classify(compartment_name: &str) -> Result<Self, AuthError> {
        let lowered = compartment_name.trim().to_lowercase();
        if lowered.ends_with("-dev") {
            Ok(Self::Dev)
        } else if lowered.ends_with("-prd") {
            Ok(Self::Prd)
        } else {
            Err(AuthError::UnresolvedEnvironment(
                compartment_name.to_owned(),
            ))
        }
    }

    /// The canonical upper-case tag for this environment.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "DEV",
            Self::Prd => "PRD",
        }
    }

    /// Both environments, in declaration order.
    #[must_use]
    pub fn all() -> [Self; 2] {
        [Self::Dev, Self::Prd]
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prd" => Ok(Self::Prd),
            _ => Err(AuthError::UnresolvedEnvironment(s.to_owned())),
        }
    }
}

/// The complete API-key credential for one environment.
///
/// A set is constructed whole or not at all; a partially configured
/// environment cannot be represented.
#[derive(Debug, Clone)]
pub struct CredentialSet {
    /// Environment these credentials sign for.
    pub environment: Environment,
    /// OCID of the API user.
    pub user_ocid: String,
    /// Fingerprint of the API key registered for that user.
    pub fingerprint: String,
    /// Where the private half of the API key comes from.
    pub key: KeySource,
}

/// Immutable per-environment credential lookup for one tenancy.
///
/// # Examples
///
/// ```
/// use stowage_auth::{CredentialRegistry, CredentialSet, Environment, KeySource};
///
/// let registry = CredentialRegistry::new(
///     "ocid1.tenancy.oc1..tttt",
///     vec![CredentialSet {
///         environment: Environment::Dev,
///         user_ocid: "ocid1.user.oc1..dev".to_owned(),
///         fingerprint: "aa:bb".to_owned(),
///         key: KeySource::Path("/etc/keys/dev.pem".into()),
///     }],
/// );
///
/// let set = registry.resolve("cp-infra-ddw3-dev").unwrap();
/// assert_eq!(set.user_ocid, "ocid1.user.oc1..dev");
/// assert!(registry.credentials_for(Environment::Prd).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CredentialRegistry {
    tenancy_ocid: String,
    sets: HashMap<Environment, CredentialSet>,
}

impl CredentialRegistry {
    /// Create a registry from explicit credential sets.
    #[must_use]
    pub fn new(
        tenancy_ocid: impl Into<String>,
        sets: impl IntoIterator<Item = CredentialSet>,
    ) -> Self {
        Self {
            tenancy_ocid: tenancy_ocid.into(),
            sets: sets.into_iter().map(|set| (set.environment, set)).collect(),
        }
    }

    /// Build the registry from environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `OCI_TENANCY_OCID` | tenancy both API users belong to (required) |
    /// | `OCI_DEV_USER_OCID` | DEV API user |
    /// | `OCI_DEV_FINGERPRINT` | DEV API key fingerprint |
    /// | `OCI_DEV_KEY_PATH` | DEV private key file |
    /// | `OCI_PRD_USER_OCID` | PRD API user |
    /// | `OCI_PRD_FINGERPRINT` | PRD API key fingerprint |
    /// | `OCI_PRD_KEY_PATH` | PRD private key file |
    ///
    /// An environment is registered only when its full triple is present;
    /// a partial triple leaves that environment unregistered and lookups
    /// for it fail with [`AuthError::UnknownEnvironment`]. The key path may
    /// be overridden by the inline key variables, see
    /// [`KeySource::from_env_or_path`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingConfig`] when `OCI_TENANCY_OCID` is absent.
    pub fn from_env() -> Result<Self, AuthError> {
        let tenancy_ocid = non_empty_var("OCI_TENANCY_OCID")
            .ok_or(AuthError::MissingConfig("OCI_TENANCY_OCID"))?;

        let sets = Environment::all()
            .into_iter()
            .filter_map(credential_set_from_env);

        Ok(Self::new(tenancy_ocid, sets))
    }

    /// Tenancy the registered API users belong to.
    #[must_use]
    pub fn tenancy_ocid(&self) -> &str {
        &self.tenancy_ocid
    }

    /// Look up the credentials registered for `environment`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownEnvironment`] when nothing is registered
    /// for it.
    pub fn credentials_for(&self, environment: Environment) -> Result<&CredentialSet, AuthError> {
        self.sets
            .get(&environment)
            .ok_or(AuthError::UnknownEnvironment(environment))
    }

    /// Classify `compartment_name` and return the matching credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnresolvedEnvironment`] when the name has no
    /// environment suffix, or [`AuthError::UnknownEnvironment`] when the
    /// classified environment has no registered credentials.
    pub fn resolve(&self, compartment_name: &str) -> Result<&CredentialSet, AuthError> {
        self.credentials_for(Environment::classify(compartment_name)?)
    }

    /// Environments with registered credentials, in declaration order.
    ///
    /// Callers that need a default environment take the first entry, so the
    /// order is fixed regardless of how the sets were inserted.
    pub fn environments(&self) -> impl Iterator<Item = Environment> + '_ {
        Environment::all()
            .into_iter()
            .filter(|environment| self.sets.contains_key(environment))
    }
}

/// Read one environment's credential triple, `None` unless all three
/// variables are present and non-empty.
fn credential_set_from_env(environment: Environment) -> Option<CredentialSet> {
    let prefix = match environment {
        Environment::Dev => "OCI_DEV",
        Environment::Prd => "OCI_PRD",
    };
    let user_ocid = non_empty_var(&format!("{prefix}_USER_OCID"))?;
    let fingerprint = non_empty_var(&format!("{prefix}_FINGERPRINT"))?;
    let key_path = non_empty_var(&format!("{prefix}_KEY_PATH"))?;

    Some(CredentialSet {
        environment,
        user_ocid,
        fingerprint,
        key: KeySource::from_env_or_path(key_path),
    })
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(environment: Environment, user: &str) -> CredentialSet {
        CredentialSet {
            environment,
            user_ocid: user.to_owned(),
            fingerprint: "12:34:56:78".to_owned(),
            key: KeySource::Path("/nonexistent.pem".into()),
        }
    }

    #[test]
    fn test_should_classify_dev_suffix() {
        assert_eq!(
            Environment::classify("cp-infra-ddw3-dev").unwrap(),
            Environment::Dev
        );
    }

    #[test]
    fn test_should_classify_prd_suffix() {
        assert_eq!(
            Environment::classify("cp-infra-ddw3-prd").unwrap(),
            Environment::Prd
        );
    }

    #[test]
    fn test_should_classify_case_insensitively() {
        assert_eq!(
            Environment::classify("CP-INFRA-DDW3-DEV").unwrap(),
            Environment::Dev
        );
        assert_eq!(
            Environment::classify("Cp-Infra-Ddw3-PrD").unwrap(),
            Environment::Prd
        );
    }

    #[test]
    fn test_should_reject_name_without_suffix() {
        let result = Environment::classify("cp-infra-ddw3");
        assert!(matches!(result, Err(AuthError::UnresolvedEnvironment(_))));
    }

    #[test]
    fn test_should_reject_empty_name() {
        assert!(matches!(
            Environment::classify(""),
            Err(AuthError::UnresolvedEnvironment(_))
        ));
    }

    #[test]
    fn test_should_parse_environment_from_str() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("PRD".parse::<Environment>().unwrap(), Environment::Prd);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_should_display_upper_case_tag() {
        assert_eq!(Environment::Dev.to_string(), "DEV");
        assert_eq!(Environment::Prd.to_string(), "PRD");
    }

    #[test]
    fn test_should_return_registered_credentials() {
        let registry = CredentialRegistry::new(
            "ocid1.tenancy.oc1..tttt",
            vec![
                set(Environment::Dev, "ocid1.user.oc1..dev"),
                set(Environment::Prd, "ocid1.user.oc1..prd"),
            ],
        );

        let dev = registry.credentials_for(Environment::Dev).unwrap();
        assert_eq!(dev.user_ocid, "ocid1.user.oc1..dev");
        assert_eq!(dev.fingerprint, "12:34:56:78");

        let prd = registry.credentials_for(Environment::Prd).unwrap();
        assert_eq!(prd.user_ocid, "ocid1.user.oc1..prd");
    }

    #[test]
    fn test_should_fail_for_unregistered_environment() {
        let registry = CredentialRegistry::new(
            "ocid1.tenancy.oc1..tttt",
            vec![set(Environment::Dev, "ocid1.user.oc1..dev")],
        );

        let result = registry.credentials_for(Environment::Prd);
        assert!(matches!(
            result,
            Err(AuthError::UnknownEnvironment(Environment::Prd))
        ));
    }

    #[test]
    fn test_should_resolve_compartment_name_to_credentials() {
        let registry = CredentialRegistry::new(
            "ocid1.tenancy.oc1..tttt",
            vec![
                set(Environment::Dev, "ocid1.user.oc1..dev"),
                set(Environment::Prd, "ocid1.user.oc1..prd"),
            ],
        );

        assert_eq!(
            registry.resolve("cp-infra-ddw3-dev").unwrap().user_ocid,
            "ocid1.user.oc1..dev"
        );
        assert_eq!(
            registry.resolve("cp-infra-ddw3-prd").unwrap().user_ocid,
            "ocid1.user.oc1..prd"
        );
    }

    #[test]
    fn test_should_propagate_unresolved_environment_from_resolve() {
        let registry = CredentialRegistry::new(
            "ocid1.tenancy.oc1..tttt",
            vec![set(Environment::Dev, "ocid1.user.oc1..dev")],
        );

        let result = registry.resolve("cp-infra-ddw3");
        assert!(matches!(result, Err(AuthError::UnresolvedEnvironment(_))));
    }

    #[test]
    fn test_should_list_registered_environments() {
        let registry = CredentialRegistry::new(
            "ocid1.tenancy.oc1..tttt",
            vec![set(Environment::Dev, "ocid1.user.oc1..dev")],
        );

        let environments: Vec<_> = registry.environments().collect();
        assert_eq!(environments, vec![Environment::Dev]);
    }

    #[test]
    fn test_should_list_environments_in_declaration_order() {
        // Prd inserted first; the listing must not depend on insertion order.
        let registry = CredentialRegistry::new(
            "ocid1.tenancy.oc1..tttt",
            vec![
                set(Environment::Prd, "ocid1.user.oc1..prd"),
                set(Environment::Dev, "ocid1.user.oc1..dev"),
            ],
        );

        let environments: Vec<_> = registry.environments().collect();
        assert_eq!(environments, vec![Environment::Dev, Environment::Prd]);
    }
}
