use serde_json::{json, Value};
use stake_jsonrpc::{ApiKeyManager, CallerMeta, RpcImpl, RpcServer, SharedLedger};
use stake_ledger::{Configuration, EventLog, InMemoryVault, ManualClock, StakingLedger};
use stake_registry::MemoryRoleRegistry;
use stake_shared_types::Address;
use std::sync::{Arc, Mutex};

const ADMIN: Address = Address([0xAA; 20]);
const STAKER: Address = Address([0x01; 20]);

struct Node {
    server: RpcServer,
    ledger: SharedLedger,
    clock: ManualClock,
    vault: InMemoryVault,
}

fn node() -> Node {
    let _ = env_logger::builder().is_test(true).try_init();
    let vault = InMemoryVault::new();
    let clock = ManualClock::new(10_000);
    let events = EventLog::new();
    let ledger = Arc::new(Mutex::new(StakingLedger::new(
        Configuration::new(100, 100),
        ADMIN,
        MemoryRoleRegistry::new(),
        Box::new(vault.clone()),
        Arc::new(clock.clone()),
        Box::new(events.clone()),
    )));

    let mut keys = ApiKeyManager::new();
    keys.insert("admin-key", ADMIN);
    keys.insert("staker-key", STAKER);
    let server = RpcServer::new(RpcImpl::new(ledger.clone(), events), keys);
    Node { server, ledger, clock, vault }
}

fn call(node: &Node, caller: Option<Address>, method: &str, params: Value) -> Value {
    let request = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
    let response = node
        .server
        .handler()
        .handle_request_sync(&request.to_string(), CallerMeta { caller })
        .expect("a response for a request with an id");
    serde_json::from_str(&response).unwrap()
}

fn error_code(response: &Value) -> i64 {
    response["error"]["code"].as_i64().unwrap()
}

#[test]
fn test_state_changes_require_an_api_key() {
    let node = node();
    let response = call(&node, None, "register", json!([[1], 100]));
    assert_eq!(error_code(&response), 401);
    assert!(!node.ledger.lock().unwrap().is_registered(&STAKER));

    // Reads stay open.
    let response = call(&node, None, "get_configuration", json!([]));
    assert_eq!(
        response["result"],
        json!({ "registration_deposit_amount": 100, "withdrawal_wait_time": 100 })
    );
}

#[test]
fn test_staker_lifecycle_over_rpc() {
    let node = node();

    let response = call(&node, Some(STAKER), "register", json!([[1], 100]));
    assert_eq!(response["result"]["registered"], json!(true));
    assert_eq!(response["result"]["roles"], json!(["ROLE_1"]));
    assert_eq!(response["result"]["staked_balance"], json!(100));

    let response = call(&node, Some(STAKER), "unstake", json!([]));
    assert_eq!(response["result"]["pending_withdrawal_balance"], json!(100));
    assert_eq!(response["result"]["withdrawal_unlock_time"], json!(10_100));
    assert_eq!(response["result"]["withdrawable"], json!(false));

    let response = call(&node, Some(STAKER), "withdraw", json!([]));
    assert_eq!(error_code(&response), 1015);
    assert_eq!(response["error"]["data"], json!({ "now": 10_000, "unlock_time": 10_100 }));

    node.clock.advance(100);
    let response = call(&node, Some(STAKER), "withdraw", json!([]));
    assert_eq!(response["result"], json!(100));
    assert_eq!(node.vault.paid_to(&STAKER), 100);

    let response = call(&node, None, "get_events", json!([0]));
    assert_eq!(event_kinds(&response), vec!["registered", "staked", "unstaked", "withdrawn"]);

    let response = call(&node, None, "get_events", json!([1, 2]));
    assert_eq!(event_kinds(&response), vec!["staked", "unstaked"]);
}

fn event_kinds(response: &Value) -> Vec<&str> {
    response["result"].as_array().unwrap().iter().map(|event| event["type"].as_str().unwrap()).collect()
}

#[test]
fn test_get_events_pages_a_bounded_log() {
    let events = EventLog::with_capacity(2);
    let ledger = Arc::new(Mutex::new(StakingLedger::new(
        Configuration::new(100, 100),
        ADMIN,
        MemoryRoleRegistry::new(),
        Box::new(InMemoryVault::new()),
        Arc::new(ManualClock::new(10_000)),
        Box::new(events.clone()),
    )));
    let mut keys = ApiKeyManager::new();
    keys.insert("staker-key", STAKER);
    let server = RpcServer::new(RpcImpl::new(ledger.clone(), events.clone()), keys);
    let node = Node { server, ledger, clock: ManualClock::new(10_000), vault: InMemoryVault::new() };

    call(&node, Some(STAKER), "register", json!([[1], 100]));
    call(&node, Some(STAKER), "stake", json!([50]));
    call(&node, Some(STAKER), "unstake", json!([]));

    // Positions 0 and 1 (the registration and its deposit) have been evicted.
    assert_eq!(events.first_index(), 2);
    assert_eq!(events.next_index(), 4);
    assert_eq!(event_kinds(&call(&node, None, "get_events", json!([0]))), vec!["staked", "unstaked"]);
    assert_eq!(event_kinds(&call(&node, None, "get_events", json!([3, 10]))), vec!["unstaked"]);
    assert!(event_kinds(&call(&node, None, "get_events", json!([4]))).is_empty());
}

#[test]
fn test_admin_methods_check_the_caller() {
    let node = node();
    call(&node, Some(STAKER), "register", json!([[2], 150]));
    let staker = STAKER.to_string();

    let response = call(&node, Some(STAKER), "slash", json!([staker, 50]));
    assert_eq!(error_code(&response), 403);

    let response = call(&node, Some(ADMIN), "slash", json!([staker, 50]));
    assert_eq!(response["result"]["staked_balance"], json!(100));

    let response = call(&node, None, "get_slashed_total", json!([]));
    assert_eq!(response["result"], json!(50));

    let treasury = Address([0xEE; 20]);
    let response = call(&node, Some(ADMIN), "sweep_slashed", json!([treasury.to_string()]));
    assert_eq!(response["result"], json!(50));
    assert_eq!(node.vault.paid_to(&treasury), 50);

    let response = call(&node, Some(ADMIN), "sweep_slashed", json!([Address::ZERO.to_string()]));
    assert_eq!(error_code(&response), 1006);
}

#[test]
fn test_role_management_over_rpc() {
    let node = node();
    let staker = STAKER.to_string();

    let response = call(&node, Some(ADMIN), "grant_role", json!([staker, 3]));
    assert_eq!(response["result"], json!("ROLE_3"));
    let response = call(&node, None, "is_registered", json!([staker]));
    assert_eq!(response["result"], json!(true));

    let response = call(&node, Some(ADMIN), "revoke_role", json!([staker, 3]));
    assert_eq!(response["result"], json!(true));
    let response = call(&node, None, "get_roles", json!([staker]));
    assert_eq!(response["result"], json!([]));

    let response = call(&node, Some(ADMIN), "set_configuration", json!([0, 5]));
    assert_eq!(response["result"], json!({ "registration_deposit_amount": 0, "withdrawal_wait_time": 5 }));
}

#[test]
fn test_partial_registration_reports_granted_roles() {
    let node = node();
    let response = call(&node, Some(STAKER), "register", json!([[1, 9], 100]));
    assert_eq!(error_code(&response), 1002);
    assert_eq!(response["error"]["data"], json!({ "granted": ["ROLE_1"] }));

    let response = call(&node, None, "get_account", json!([STAKER.to_string()]));
    assert_eq!(response["result"]["registered"], json!(true));
    assert_eq!(response["result"]["staked_balance"], json!(0));
}

#[test]
fn test_malformed_address_is_invalid_params() {
    let node = node();
    let response = call(&node, None, "get_account", json!(["0x1234"]));
    assert_eq!(error_code(&response), -32602);
}
