//! # Organization Operations
//!
//! Composite DAO operations built from the four cores. Each operation
//! announces its transaction count up front, runs its calls through the
//! tracker and reports failures as `ArcError::Operation`.
//!
//! | Operation | Topic | Transactions |
//! |-----------|-------|--------------|
//! | `new_dao` | `txReceipts.DAO.new` | `1 + schemes` |
//! | `register_schemes` | `txReceipts.Organization.registerSchemes` (nested under `DAO.new` when called from it) | `schemes` |
//! | `schemes`, `global_constraints`, `organizations` | - | reads only |

use crate::context::ArcContext;
use crate::errors::{ArcError, OperationFailure};
use arc_01_transaction_tracking::{Composite, SingleCall, TrackedOperation, TxEventContext};
use arc_02_contract_handles::ContractHandle;
use arc_03_entity_discovery::{EventStream, RegisteredEntity};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::{Address, ContractCall, Hash, TransactionReceipt, TransactionSubmitter, U256};
use std::sync::Arc;
use tracing::info;

/// Topic suffix of organization creation.
pub const NEW_DAO: &str = "DAO.new";

/// Topic suffix of scheme registration.
pub const REGISTER_SCHEMES: &str = "Organization.registerSchemes";

const SCHEMES: &str = "Organization.schemes";
const GLOBAL_CONSTRAINTS: &str = "Organization.globalConstraints";
const ORGANIZATIONS: &str = "DAO.organizations";

/// Initial holder of tokens and reputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Founder {
    pub address: Address,
    pub tokens: U256,
    pub reputation: U256,
}

/// A scheme to register with an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeRegistration {
    pub scheme: Address,
    pub params_hash: Hash,
    /// Permission bits granted to the scheme.
    pub permissions: u32,
}

/// Arguments of `new_dao`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDaoRequest {
    pub name: String,
    pub token_name: String,
    pub token_symbol: String,
    pub founders: Vec<Founder>,
    pub schemes: Vec<SchemeRegistration>,
}

/// An organization created by `new_dao`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    /// Avatar address, the organization's on-chain identity.
    pub avatar: Address,
    pub name: String,
    pub created_at_block: u64,
}

impl NewDaoRequest {
    fn schemes_operation(&self, avatar: Address) -> Composite {
        Composite::new(REGISTER_SCHEMES, json!({ "avatar": avatar }), 0).with_children(
            self.schemes
                .iter()
                .map(|_| SingleCall::new("Avatar.registerScheme", json!({}))),
        )
    }
}

/// Organization operations over one `ArcContext`.
pub struct OrganizationService<'a> {
    context: &'a ArcContext,
}

impl<'a> OrganizationService<'a> {
    pub(crate) fn new(context: &'a ArcContext) -> Self {
        Self { context }
    }

    /// Create an organization and register its initial schemes.
    ///
    /// Announces `1 + schemes` transactions on `txReceipts.DAO.new`: the
    /// creation call, then the nested scheme registrations.
    ///
    /// # Errors
    ///
    /// `ArcError::Operation` naming `DAO.new` with the underlying cause.
    pub async fn new_dao(&self, request: &NewDaoRequest) -> Result<Organization, ArcError> {
        self.create(request)
            .await
            .map_err(|source| ArcError::operation(NEW_DAO, source))
    }

    async fn create(&self, request: &NewDaoRequest) -> Result<Organization, OperationFailure> {
        let tracker = self.context.tracker();
        let creator = self.contract("DaoCreator")?;
        let options = serde_json::to_value(request)?;

        let plan = Composite::new(NEW_DAO, options.clone(), 1)
            .with_child(request.schemes_operation(Address::ZERO));
        let context = tracker.begin(&plan, None)?;

        let call = ContractCall::new(creator.address(), creator.contract_type(), "forgeOrg")
            .with_args(options);
        let receipt = tracker
            .run_step(&context, self.context.network().submit(call))
            .await?;
        let avatar = receipt
            .find_log("NewOrg")
            .and_then(|log| log.address_arg("_avatar"))
            .ok_or_else(|| OperationFailure::MissingEvent {
                tx: receipt.tx_hash,
                event: "NewOrg".to_string(),
            })?;

        if !request.schemes.is_empty() {
            self.register(avatar, &request.schemes, Some(&context)).await?;
        }
        tracker.complete(&context)?;

        info!(
            avatar = %avatar,
            name = %request.name,
            schemes = request.schemes.len(),
            "Organization created"
        );
        Ok(Organization {
            avatar,
            name: request.name.clone(),
            created_at_block: receipt.block_number,
        })
    }

    /// Register schemes with an organization, one transaction each.
    ///
    /// # Errors
    ///
    /// `ArcError::Operation` naming `Organization.registerSchemes`.
    pub async fn register_schemes(
        &self,
        avatar: Address,
        schemes: &[SchemeRegistration],
    ) -> Result<Vec<TransactionReceipt>, ArcError> {
        self.register(avatar, schemes, None)
            .await
            .map_err(|source| ArcError::operation(REGISTER_SCHEMES, source))
    }

    async fn register(
        &self,
        avatar: Address,
        schemes: &[SchemeRegistration],
        parent: Option<&TxEventContext>,
    ) -> Result<Vec<TransactionReceipt>, OperationFailure> {
        let tracker = self.context.tracker();
        let options = json!({ "avatar": avatar, "schemes": serde_json::to_value(schemes)? });
        let total = u32::try_from(schemes.len()).unwrap_or(u32::MAX);
        let context = tracker.begin_operation(REGISTER_SCHEMES, options, total, parent)?;

        let mut receipts = Vec::with_capacity(schemes.len());
        for scheme in schemes {
            let call = ContractCall::new(avatar, "Avatar", "registerScheme")
                .with_args(serde_json::to_value(scheme)?);
            let receipt = tracker
                .run_step(&context, self.context.network().submit(call))
                .await?;
            receipts.push(receipt);
        }
        tracker.complete(&context)?;
        Ok(receipts)
    }

    /// Schemes currently registered with the organization.
    ///
    /// # Errors
    ///
    /// `ArcError::Operation` naming `Organization.schemes`.
    pub async fn schemes(&self, avatar: Address) -> Result<Vec<RegisteredEntity>, ArcError> {
        self.context
            .discovery()
            .discover(avatar, &EventStream::schemes())
            .await
            .map_err(|source| ArcError::operation(SCHEMES, source))
    }

    /// Global constraints currently registered with the organization.
    ///
    /// # Errors
    ///
    /// `ArcError::Operation` naming `Organization.globalConstraints`.
    pub async fn global_constraints(
        &self,
        avatar: Address,
    ) -> Result<Vec<RegisteredEntity>, ArcError> {
        self.context
            .discovery()
            .discover(avatar, &EventStream::global_constraints())
            .await
            .map_err(|source| ArcError::operation(GLOBAL_CONSTRAINTS, source))
    }

    /// Avatars of every organization created through the canonical
    /// `DaoCreator`.
    ///
    /// # Errors
    ///
    /// `ArcError::Operation` naming `DAO.organizations`.
    pub async fn organizations(&self) -> Result<Vec<Address>, ArcError> {
        let lookup = async {
            let creator = self.contract("DaoCreator")?;
            let created = self
                .context
                .discovery()
                .discover_created(creator.address(), &EventStream::organizations())
                .await?;
            Ok::<Vec<Address>, OperationFailure>(created.into_iter().map(|entity| entity.address).collect())
        };
        lookup
            .await
            .map_err(|source| ArcError::operation(ORGANIZATIONS, source))
    }

    /// Step count `new_dao` announces for `request`.
    #[must_use]
    pub fn estimate_new_dao(request: &NewDaoRequest) -> u32 {
        Composite::new(NEW_DAO, json!({}), 1)
            .with_child(request.schemes_operation(Address::ZERO))
            .estimate_step_count()
    }

    fn contract(&self, contract_type: &str) -> Result<Arc<ContractHandle>, OperationFailure> {
        self.context
            .directory()
            .by_type(contract_type)
            .ok_or_else(|| OperationFailure::NotDeployed(contract_type.to_string()))
    }
}
