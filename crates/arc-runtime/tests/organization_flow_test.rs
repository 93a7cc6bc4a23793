//! # Organization Flow Tests
//!
//! Drives complete organization operations through an `ArcContext` backed by
//! the in-memory network, and checks what subscribers, discovery and the
//! directory observe.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_01_transaction_tracking::TrackerError;
use arc_runtime::{
    ArcConfig, ArcContext, ArcError, Founder, NewDaoRequest, OperationFailure, SchemeRegistration,
};
use parking_lot::Mutex;
use shared_bus::{SubscriberError, Subscription, Topic, TopicPattern};
use shared_types::{
    AbiValue, Address, Hash, InMemoryNetwork, NetworkError, StateQuery, TxEventInfo, U256,
};

const DAO_CREATOR: Address = Address::from_low_u8(0x01);
const SCHEME_REGISTRAR: Address = Address::from_low_u8(0x02);
const GLOBAL_CONSTRAINT_REGISTRAR: Address = Address::from_low_u8(0x03);
const CUSTOM_SCHEME: Address = Address::from_low_u8(0x44);

fn config() -> ArcConfig {
    ArcConfig {
        deployable_types: vec![
            "DaoCreator".to_string(),
            "SchemeRegistrar".to_string(),
            "GlobalConstraintRegistrar".to_string(),
        ],
        ..ArcConfig::default()
    }
}

fn chain() -> Arc<InMemoryNetwork> {
    let network = Arc::new(InMemoryNetwork::new("ganache"));
    network.deploy("DaoCreator", DAO_CREATOR);
    network.deploy("SchemeRegistrar", SCHEME_REGISTRAR);
    network.deploy("GlobalConstraintRegistrar", GLOBAL_CONSTRAINT_REGISTRAR);

    network.on_call("forgeOrg", |call, chain| {
        let avatar = chain.create_contract();
        let mut args = BTreeMap::new();
        args.insert("_avatar".to_string(), AbiValue::Address(avatar));
        chain.emit(call.contract, "NewOrg", args);
        Ok(())
    });

    network.on_call("registerScheme", |call, chain| {
        let registration: SchemeRegistration = serde_json::from_value(call.args.clone())
            .map_err(|e| NetworkError::Other(e.to_string()))?;
        let mut args = BTreeMap::new();
        args.insert("_scheme".to_string(), AbiValue::Address(registration.scheme));
        args.insert("_paramsHash".to_string(), AbiValue::Hash(registration.params_hash));
        chain.emit(call.contract, "RegisterScheme", args);
        chain.set_state(
            StateQuery::new(call.contract, "isSchemeRegistered")
                .arg(AbiValue::Address(registration.scheme)),
            AbiValue::Bool(true),
        );
        Ok(())
    });

    network
}

fn request(schemes: &[Address]) -> NewDaoRequest {
    NewDaoRequest {
        name: "Acme".to_string(),
        token_name: "Acme Token".to_string(),
        token_symbol: "ACM".to_string(),
        founders: vec![Founder {
            address: Address::from_low_u8(0x10),
            tokens: U256::from(1000),
            reputation: U256::from(10),
        }],
        schemes: schemes
            .iter()
            .enumerate()
            .map(|(i, scheme)| SchemeRegistration {
                scheme: *scheme,
                params_hash: Hash::from_low_u64(i as u64 + 1),
                permissions: 0x1f,
            })
            .collect(),
    }
}

type Recorded = Arc<Mutex<Vec<TxEventInfo>>>;

fn record(context: &ArcContext, pattern: TopicPattern) -> (Recorded, Subscription) {
    let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = context.bus().subscribe(pattern, move |_, event| {
        if let Some(info) = event.as_tx_lifecycle() {
            sink.lock().push(info.clone());
        }
        Ok::<(), SubscriberError>(())
    });
    (seen, subscription)
}

fn exact(topic: &str) -> TopicPattern {
    TopicPattern::exact(&Topic::parse(topic).unwrap())
}

fn counts(infos: &[TxEventInfo]) -> Vec<u32> {
    infos.iter().map(|info| info.tx_count).collect()
}

#[tokio::test]
async fn test_new_dao_publishes_one_plus_n_notifications() {
    let network = chain();
    let context = ArcContext::initialize(config(), network.clone()).await.unwrap();

    let (parent, _a) = record(&context, exact("txReceipts.DAO.new"));
    let (below, _b) = record(&context, TopicPattern::parse("txReceipts.DAO.new.*").unwrap());
    let (child, _c) = record(
        &context,
        exact("txReceipts.DAO.new.Organization.registerSchemes"),
    );

    let dao = context
        .organizations()
        .new_dao(&request(&[SCHEME_REGISTRAR, CUSTOM_SCHEME]))
        .await
        .unwrap();
    assert_eq!(dao.name, "Acme");
    assert!(!dao.avatar.is_zero());

    let parent = parent.lock();
    // Kickoff, creation, nested kickoff, two registrations.
    assert_eq!(counts(&parent), vec![0, 1, 1, 2, 3]);
    assert_eq!(parent.iter().filter(|info| info.tx.is_some()).count(), 3);
    assert_eq!(parent[0].options["tokenSymbol"], "ACM");
    assert!(parent[2].is_kickoff());

    let child = child.lock();
    assert_eq!(counts(&child), vec![0, 1, 2]);
    assert_eq!(parent[2].context_id, child[0].context_id);
    // Each nested transaction reaches the parent with the same receipt.
    assert_eq!(child[1].tx, parent[3].tx);
    assert_eq!(child[2].tx, parent[4].tx);

    assert_eq!(below.lock().as_slice(), child.as_slice());

    assert_eq!(network.submitted_calls().len(), 3);
}

#[tokio::test]
async fn test_discovery_after_new_dao() {
    let context = ArcContext::initialize(config(), chain()).await.unwrap();
    let organizations = context.organizations();

    let dao = organizations
        .new_dao(&request(&[SCHEME_REGISTRAR, CUSTOM_SCHEME]))
        .await
        .unwrap();

    let schemes = organizations.schemes(dao.avatar).await.unwrap();
    let addresses: Vec<Address> = schemes.iter().map(|s| s.address).collect();
    assert_eq!(addresses, vec![SCHEME_REGISTRAR, CUSTOM_SCHEME]);
    assert_eq!(schemes[0].contract_type.as_deref(), Some("SchemeRegistrar"));
    assert_eq!(schemes[1].contract_type, None);
    assert_eq!(schemes[1].params_hash, Some(Hash::from_low_u64(2)));

    assert!(organizations
        .global_constraints(dao.avatar)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(organizations.organizations().await.unwrap(), vec![dao.avatar]);
}

#[tokio::test]
async fn test_register_schemes_standalone() {
    let context = ArcContext::initialize(config(), chain()).await.unwrap();
    let organizations = context.organizations();
    let dao = organizations.new_dao(&request(&[])).await.unwrap();

    let (seen, _sub) = record(&context, exact("txReceipts.Organization.registerSchemes"));
    let receipts = organizations
        .register_schemes(dao.avatar, &request(&[CUSTOM_SCHEME]).schemes)
        .await
        .unwrap();

    assert_eq!(receipts.len(), 1);
    assert_eq!(counts(&seen.lock()), vec![0, 1]);
    assert_eq!(organizations.schemes(dao.avatar).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_transaction_names_operation() {
    let network = chain();
    let context = ArcContext::initialize(config(), network.clone()).await.unwrap();
    let (seen, _sub) = record(&context, exact("txReceipts.DAO.new"));

    network.fail_next_submission("reverted");
    let err = context
        .organizations()
        .new_dao(&request(&[CUSTOM_SCHEME]))
        .await
        .unwrap_err();

    assert_eq!(err.operation_name(), Some("DAO.new"));
    assert!(matches!(
        err,
        ArcError::Operation {
            source: OperationFailure::Tracking(TrackerError::StepFailed { step: 1, .. }),
            ..
        }
    ));
    // Only the kickoff was published.
    assert_eq!(counts(&seen.lock()), vec![0]);
}

#[tokio::test]
async fn test_unsubscribed_listener_sees_nothing_further() {
    let context = ArcContext::initialize(config(), chain()).await.unwrap();
    let (seen, subscription) = record(&context, TopicPattern::All);

    context.organizations().new_dao(&request(&[])).await.unwrap();
    let before = seen.lock().len();
    assert_eq!(before, 2);

    subscription.unsubscribe();
    context.organizations().new_dao(&request(&[])).await.unwrap();
    assert_eq!(seen.lock().len(), before);
}

#[tokio::test]
async fn test_reinitialize_without_creator() {
    let mut context = ArcContext::initialize(config(), chain()).await.unwrap();

    let other = Arc::new(InMemoryNetwork::new("kovan"));
    other.deploy("SchemeRegistrar", Address::from_low_u8(0x92));
    let err = context.reinitialize(other).await.unwrap_err();
    assert!(matches!(err, ArcError::Directory(_)));

    assert!(!context.directory().is_initialized());
    assert!(context.cache().is_empty());
    let err = context.organizations().organizations().await.unwrap_err();
    assert!(matches!(
        err,
        ArcError::Operation {
            source: OperationFailure::NotDeployed(_),
            ..
        }
    ));
}
