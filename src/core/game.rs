//! Game rules: how an inbound event changes the world and what it broadcasts
//!
//! Rules operate on `&mut Accounts`, which can only be obtained through the
//! registry's write lock. One event is therefore applied atomically against
//! every account it touches.

use log::{debug, info};

use crate::core::event::{Action, Event, Outbound, PositionView};
use crate::core::geometry::{Arena, Direction};
use crate::storage::accounts::Accounts;

/// Apply one event and return the broadcasts it produces, in order
pub fn apply(accounts: &mut Accounts, arena: &Arena, event: &Event) -> Vec<Outbound> {
    match &event.action {
        Action::Move(direction) => apply_move(accounts, arena, &event.user_id, *direction)
            .into_iter()
            .collect(),
        Action::Attack => apply_attack(accounts, &event.user_id),
        Action::Chat(msg) if accounts.contains(&event.user_id) => vec![Outbound::Chat {
            user_id: event.user_id.clone(),
            msg: msg.clone(),
        }],
        Action::Chat(_) => {
            debug!("Chat from {} ignored: account no longer exists", event.user_id);
            Vec::new()
        }
        Action::Unknown(tag) => {
            debug!("Ignoring event with unknown tag {} from {}", tag, event.user_id);
            Vec::new()
        }
    }
}

/// Move one step, clamped to the arena. `None` when the account is gone.
pub fn apply_move(
    accounts: &mut Accounts,
    arena: &Arena,
    user_id: &str,
    direction: Direction,
) -> Option<Outbound> {
    let account = match accounts.get_mut(user_id) {
        Some(account) => account,
        None => {
            debug!("Move from {} ignored: account no longer exists", user_id);
            return None;
        }
    };

    account.position = arena.step(&account.position, direction);
    account.facing = direction;

    Some(Outbound::Moved {
        user_id: account.id.clone(),
        position: PositionView::new(&account.position, account.facing),
    })
}

/// Hit every account overlapping the attacker. Each hit yields a health
/// update for the victim followed by a notification naming both sides.
pub fn apply_attack(accounts: &mut Accounts, attacker_id: &str) -> Vec<Outbound> {
    let (attacker_name, reach) = match accounts.get(attacker_id) {
        Some(attacker) => (attacker.username.clone(), attacker.position),
        None => {
            debug!("Attack from {} ignored: account no longer exists", attacker_id);
            return Vec::new();
        }
    };

    let victims: Vec<String> = accounts
        .iter()
        .filter(|other| other.id != attacker_id && reach.intersects(&other.position))
        .map(|other| other.id.clone())
        .collect();

    let mut outbound = Vec::with_capacity(victims.len() * 2);
    for victim_id in victims {
        let Some(victim) = accounts.get_mut(&victim_id) else {
            continue;
        };

        victim.health = victim.health.saturating_sub(1);
        let health = victim.health;
        let victim_name = victim.username.clone();
        let eliminated = health == 0;

        if eliminated {
            accounts.remove(&victim_id);
            info!("{} eliminated {}", attacker_name, victim_name);
        }

        outbound.push(Outbound::Damaged {
            user_id: victim_id,
            health,
            eliminated,
        });
        outbound.push(Outbound::Chat {
            user_id: attacker_id.to_string(),
            msg: format!("{} is dominating {}!", attacker_name, victim_name),
        });
    }

    outbound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Rect;
    use crate::storage::accounts::Account;

    fn account_at(name: &str, x: f64, y: f64) -> Account {
        let mut account = Account::new(name.to_string(), "hash".to_string());
        account.position = Rect::new(x, y, 16.0, 32.0);
        account
    }

    fn event(user_id: &str, action: Action) -> Event {
        Event {
            user_id: user_id.to_string(),
            action,
        }
    }

    #[test]
    fn test_move_broadcasts_updated_position() {
        let alice = account_at("alice", 10.0, 10.0);
        let id = alice.id.clone();
        let mut accounts = Accounts::from_accounts(vec![alice]);

        let out = apply(&mut accounts, &Arena::default(), &event(&id, Action::Move(Direction::East)));

        assert_eq!(out.len(), 1);
        match &out[0] {
            Outbound::Moved { user_id, position } => {
                assert_eq!(user_id, &id);
                assert_eq!(position.dimensions.x, 11.0);
                assert_eq!(position.dimensions.y, 10.0);
                assert_eq!(position.direction, Direction::East);
            }
            other => panic!("unexpected broadcast {:?}", other),
        }
        assert_eq!(accounts.get(&id).unwrap().facing, Direction::East);
    }

    #[test]
    fn test_move_at_boundary_never_leaves_map() {
        let arena = Arena::default();
        let edge = account_at("edge", 0.0, 0.0);
        let id = edge.id.clone();
        let mut accounts = Accounts::from_accounts(vec![edge]);

        for direction in [Direction::West, Direction::North] {
            let out = apply(&mut accounts, &arena, &event(&id, Action::Move(direction)));
            assert_eq!(out.len(), 1);
        }
        let position = accounts.get(&id).unwrap().position;
        assert_eq!((position.x, position.y), (0.0, 0.0));

        let far = arena.width - 16.0;
        let low = arena.height - 32.0;
        accounts.get_mut(&id).unwrap().position = Rect::new(far, low, 16.0, 32.0);
        apply(&mut accounts, &arena, &event(&id, Action::Move(Direction::East)));
        apply(&mut accounts, &arena, &event(&id, Action::Move(Direction::South)));
        let position = accounts.get(&id).unwrap().position;
        assert_eq!((position.x, position.y), (far, low));
    }

    #[test]
    fn test_move_from_missing_account_is_ignored() {
        let mut accounts = Accounts::new();
        let out = apply(&mut accounts, &Arena::default(), &event("ghost", Action::Move(Direction::North)));
        assert!(out.is_empty());
    }

    #[test]
    fn test_attack_damages_overlapping_account() {
        let attacker = account_at("alice", 0.0, 0.0);
        let victim = account_at("bob", 8.0, 8.0);
        let bystander = account_at("carol", 500.0, 500.0);
        let (a, b, c) = (attacker.id.clone(), victim.id.clone(), bystander.id.clone());
        let mut accounts = Accounts::from_accounts(vec![attacker, victim, bystander]);

        let out = apply(&mut accounts, &Arena::default(), &event(&a, Action::Attack));

        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            Outbound::Damaged {
                user_id: b.clone(),
                health: 5,
                eliminated: false
            }
        );
        assert_eq!(
            out[1],
            Outbound::Chat {
                user_id: a.clone(),
                msg: "alice is dominating bob!".to_string()
            }
        );
        assert_eq!(accounts.get(&a).unwrap().health, 6);
        assert_eq!(accounts.get(&b).unwrap().health, 5);
        assert_eq!(accounts.get(&c).unwrap().health, 6);
    }

    #[test]
    fn test_attack_eliminates_at_zero_and_repeat_is_harmless() {
        let attacker = account_at("alice", 0.0, 0.0);
        let mut victim = account_at("bob", 0.0, 0.0);
        victim.health = 1;
        let (a, b) = (attacker.id.clone(), victim.id.clone());
        let mut accounts = Accounts::from_accounts(vec![attacker, victim]);

        let out = apply(&mut accounts, &Arena::default(), &event(&a, Action::Attack));
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            Outbound::Damaged {
                user_id: b.clone(),
                health: 0,
                eliminated: true
            }
        );
        assert!(matches!(out[1], Outbound::Chat { .. }));
        assert!(!accounts.contains(&b));

        let again = apply(&mut accounts, &Arena::default(), &event(&a, Action::Attack));
        assert!(again.is_empty());
        assert_eq!(accounts.len(), 1);
    }

    #[test]
    fn test_attack_never_hits_self() {
        let alone = account_at("alice", 0.0, 0.0);
        let id = alone.id.clone();
        let mut accounts = Accounts::from_accounts(vec![alone]);

        let out = apply(&mut accounts, &Arena::default(), &event(&id, Action::Attack));
        assert!(out.is_empty());
        assert_eq!(accounts.get(&id).unwrap().health, 6);
    }

    #[test]
    fn test_attack_edge_adjacent_misses() {
        let attacker = account_at("alice", 0.0, 0.0);
        let neighbour = account_at("bob", 16.0, 0.0);
        let a = attacker.id.clone();
        let mut accounts = Accounts::from_accounts(vec![attacker, neighbour]);

        assert!(apply(&mut accounts, &Arena::default(), &event(&a, Action::Attack)).is_empty());
    }

    #[test]
    fn test_attack_hits_every_overlapping_account() {
        let attacker = account_at("alice", 10.0, 10.0);
        let a = attacker.id.clone();
        let mut accounts = Accounts::from_accounts(vec![
            attacker,
            account_at("bob", 0.0, 0.0),
            account_at("carol", 20.0, 20.0),
        ]);

        let out = apply(&mut accounts, &Arena::default(), &event(&a, Action::Attack));
        assert_eq!(out.len(), 4);
        let damaged = out
            .iter()
            .filter(|o| matches!(o, Outbound::Damaged { .. }))
            .count();
        assert_eq!(damaged, 2);
    }

    #[test]
    fn test_attack_from_eliminated_account_does_nothing() {
        let victim = account_at("bob", 0.0, 0.0);
        let mut accounts = Accounts::from_accounts(vec![victim]);
        assert!(apply(&mut accounts, &Arena::default(), &event("gone", Action::Attack)).is_empty());
    }

    #[test]
    fn test_chat_is_republished_verbatim() {
        let alice = account_at("alice", 0.0, 0.0);
        let id = alice.id.clone();
        let mut accounts = Accounts::from_accounts(vec![alice]);
        let out = apply(
            &mut accounts,
            &Arena::default(),
            &event(&id, Action::Chat("  gg <b>wp</b> ".to_string())),
        );
        assert_eq!(
            out,
            vec![Outbound::Chat {
                user_id: id,
                msg: "  gg <b>wp</b> ".to_string()
            }]
        );
    }

    #[test]
    fn test_chat_from_eliminated_account_is_dropped() {
        let mut accounts = Accounts::new();
        let out = apply(&mut accounts, &Arena::default(), &event("gone", Action::Chat("hi".to_string())));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let alice = account_at("alice", 0.0, 0.0);
        let id = alice.id.clone();
        let mut accounts = Accounts::from_accounts(vec![alice.clone()]);

        let out = apply(&mut accounts, &Arena::default(), &event(&id, Action::Unknown(9)));
        assert!(out.is_empty());
        assert_eq!(accounts.get(&id), Some(&alice));
    }
}
