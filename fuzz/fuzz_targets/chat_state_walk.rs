//! Fuzz target for the session registry, group store, and router
//!
//! Drives arbitrary interleavings of logins, logouts, group operations,
//! and raw command dispatch against the shared stores, mirroring the
//! expected liveness in a plain model.
//!
//! # Strategy
//!
//! - Logins for fresh and already-online usernames
//! - Logouts running the full disconnect purge
//! - Group create/join/leave over a small colliding name space
//! - Dispatch of arbitrary text lines from online users
//!
//! # Invariants
//!
//! - At most one live session per username, always agreeing with the model
//! - Member sets stay subsets of the online usernames and are never empty
//! - Dispatch never panics and only ever targets live handles
//! - Broadcast fan-out never includes the sender

#![no_main]

use std::collections::{HashMap, HashSet};

use arbitrary::Arbitrary;
use banter_proto::Command;
use banter_server::{GroupStore, Router, SessionRegistry};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum ChatOp {
    Login { user: u8 },
    Logout { user: u8 },
    CreateGroup { user: u8, group: u8 },
    JoinGroup { user: u8, group: u8 },
    LeaveGroup { user: u8, group: u8 },
    Dispatch { user: u8, line: String },
}

fn username(user: u8) -> String {
    format!("user{}", user % 6)
}

fn group_name(group: u8) -> String {
    format!("group{}", group % 4)
}

fuzz_target!(|ops: Vec<ChatOp>| {
    let sessions = SessionRegistry::new();
    let groups = GroupStore::new();
    let router = Router::new(sessions.clone(), groups.clone());

    // user id (mod 6) -> live handle
    let mut online: HashMap<u8, u64> = HashMap::new();
    let mut next_handle: u64 = 0;

    for op in ops {
        match op {
            ChatOp::Login { user } => {
                let user = user % 6;
                let handle = next_handle;
                next_handle += 1;

                let accepted = sessions.register(handle, &username(user)).is_ok();
                if online.contains_key(&user) {
                    assert!(!accepted, "second session admitted for one username");
                } else {
                    assert!(accepted, "fresh login refused");
                    online.insert(user, handle);
                }
            },
            ChatOp::Logout { user } => {
                let user = user % 6;
                if let Some(handle) = online.remove(&user) {
                    assert_eq!(sessions.unregister(handle), Some(username(user)));
                    groups.remove_user_everywhere(&username(user));
                }
            },
            ChatOp::CreateGroup { user, group } => {
                if online.contains_key(&(user % 6)) {
                    let _ = groups.create(&group_name(group), &username(user));
                }
            },
            ChatOp::JoinGroup { user, group } => {
                if online.contains_key(&(user % 6)) {
                    let _ = groups.join(&group_name(group), &username(user));
                }
            },
            ChatOp::LeaveGroup { user, group } => {
                if online.contains_key(&(user % 6)) {
                    let _ = groups.leave(&group_name(group), &username(user));
                }
            },
            ChatOp::Dispatch { user, line } => {
                let user = user % 6;
                let Some(&handle) = online.get(&user) else {
                    continue;
                };

                let deliveries = router.dispatch(handle, &username(user), &line);

                let live: HashSet<u64> = online.values().copied().collect();
                for delivery in &deliveries {
                    assert!(live.contains(&delivery.target), "delivery to a dead handle");
                }

                if let Ok(Command::Broadcast { .. }) = Command::parse(&line) {
                    assert!(
                        deliveries.iter().all(|d| d.target != handle),
                        "broadcast echoed to its sender"
                    );
                }
            },
        }

        verify_store_invariants(&sessions, &groups, &online);
    }
});

fn verify_store_invariants(
    sessions: &SessionRegistry,
    groups: &GroupStore,
    online: &HashMap<u8, u64>,
) {
    assert_eq!(sessions.session_count(), online.len());
    for (user, handle) in online {
        assert_eq!(sessions.find_by_username(&username(*user)), Some(*handle));
    }

    let online_names: HashSet<String> = online.keys().map(|user| username(*user)).collect();
    for group in 0u8..4 {
        if let Some(members) = groups.members_of(&group_name(group)) {
            assert!(!members.is_empty(), "empty group survived");
            for member in &members {
                assert!(online_names.contains(member), "offline member retained");
            }
        }
    }
}
