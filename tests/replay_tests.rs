//! Replay fold tests against whole battle logs

use pretty_assertions::assert_eq;
use serde_json::json;

use dungeon_log::battle::{self, BattleEvent};
use dungeon_log::replay::{replay, replay_to, LineKind, NO_DATA_MESSAGE};

const FIXTURE: &str = include_str!("fixtures/two_stage_run.json");

fn events(value: serde_json::Value) -> Vec<BattleEvent> {
    battle::events_from_value(value).expect("valid log")
}

fn texts(events: &[BattleEvent]) -> Vec<String> {
    replay(events)
        .narrative
        .into_iter()
        .map(|line| line.text)
        .collect()
}

fn single_stage_victory() -> Vec<BattleEvent> {
    events(json!([
        {
            "type": "battle_start",
            "allies": [{ "id": "a", "name": "A", "hp": 50, "maxHp": 100 }],
            "enemies": [{ "id": "e", "name": "E", "hp": 40, "maxHp": 40 }],
            "totalStages": 2
        },
        { "type": "stage_start", "currentStage": 1, "enemies": [{ "id": "e", "name": "E", "hp": 40, "maxHp": 40 }] },
        {
            "type": "round",
            "number": 1,
            "actions": [{ "actor": "A", "skill": "Slash", "target": "E", "damage": 10, "isCritical": false }],
            "remainingAllies": 1,
            "remainingEnemies": 1
        },
        { "type": "stage_complete", "currentStage": 1, "aliveAllies": [{ "id": "a", "name": "A", "hp": 50, "maxHp": 100 }] },
        { "type": "battle_end", "victory": true, "completedStages": 2, "totalStages": 2 }
    ]))
}

#[test]
fn test_short_victory_narrative() {
    let events = single_stage_victory();

    let opening = replay_to(&events, 1);
    assert_eq!(opening.allies[0].hp, 100);

    assert_eq!(
        texts(&events),
        vec![
            "Battle initialized: 1 ally vs 1 enemy.",
            "This dungeon has 2 stages.",
            "1 enemy appears!",
            "=== Stage 1 begins ===",
            "Round 1 begins.",
            "A used Slash on E for 10 damage",
            "1 ally and 1 enemy remain.",
            "=== Stage 1 complete ===",
            "Victory! Your party cleared 2/2 stages.",
        ]
    );

    let state = replay(&events);
    assert_eq!(state.victory, Some(true));
    assert_eq!(state.stages_completed, 2);
    assert_eq!(state.total_stages, 2);
    assert_eq!(state.current_round, 1);
}

#[test]
fn test_replay_is_deterministic() {
    let events = battle::parse_log(FIXTURE).unwrap();
    assert_eq!(replay(&events), replay(&events));
}

#[test]
fn test_empty_log_is_exactly_the_fallback() {
    let state = replay(&[]);
    assert_eq!(state.narrative.len(), 1);
    assert_eq!(state.narrative[0].text, NO_DATA_MESSAGE);
    assert!(state.allies.is_empty());
    assert!(state.enemies.is_empty());
    assert_eq!(state.victory, None);
}

#[test]
fn test_recorded_fixture_replays_end_to_end() {
    let events = battle::parse_log(FIXTURE).unwrap();
    // The unknown type and the round with a garbage action list both survive
    // as events that add no lines.
    assert_eq!(events.len(), 10);
    assert!(events.contains(&BattleEvent::Unknown));

    let state = replay(&events);
    let lines: Vec<&str> = state.narrative.iter().map(|l| l.text.as_str()).collect();

    assert_eq!(lines.len(), 17);
    assert_eq!(lines[0], "Battle initialized: 2 allies vs 1 enemy.");
    assert!(lines.contains(&"Aria used Slash on Goblin for 18 damage (Critical hit!)"));
    assert!(lines.contains(&"Bram used Mend to heal Bram for 15 HP"));
    assert!(lines.contains(&"2 allies and 1 enemy remain."));
    assert!(lines.contains(&"All enemies have been defeated this round!"));
    assert!(lines.contains(&"System: The gate to stage 2 opens."));
    assert!(lines.contains(&"2 enemies appear!"));
    assert_eq!(lines.last(), Some(&"Defeat. Your party cleared 1/2 stages."));

    assert_eq!(state.narrative.last().map(|l| l.kind), Some(LineKind::Defeat));
    assert_eq!(state.current_stage, 2);
    assert_eq!(state.current_round, 2);
}

#[test]
fn test_health_tracks_actions_mid_replay() {
    let events = battle::parse_log(FIXTURE).unwrap();

    // battle_start, stage_start, round 1
    let state = replay_to(&events, 3);
    let hp = |name: &str| {
        state
            .allies
            .iter()
            .chain(&state.enemies)
            .find(|u| u.name == name)
            .map(|u| u.hp)
    };
    assert_eq!(hp("Aria"), Some(100));
    assert_eq!(hp("Bram"), Some(75));
    assert_eq!(hp("Goblin"), Some(12));
}

#[test]
fn test_stage_complete_drops_fallen_allies() {
    let events = battle::parse_log(FIXTURE).unwrap();
    let before = replay_to(&events, 4);
    let after = replay_to(&events, 5);

    assert_eq!(before.allies.len(), 2);
    assert_eq!(after.allies.len(), 1);
    assert_eq!(after.allies[0].name, "Aria");
    assert_eq!(after.stages_completed, 1);
}

#[test]
fn test_every_prefix_grows_the_narrative() {
    let events = battle::parse_log(FIXTURE).unwrap();
    let mut previous = 0;
    for position in 1..=events.len() {
        let len = replay_to(&events, position).narrative.len();
        assert!(len >= previous, "narrative shrank at event {position}");
        previous = len;
    }
    assert_eq!(previous, replay(&events).narrative.len());
}

#[test]
fn test_round_with_null_fields_still_replays() {
    let events = events(json!([
        {
            "type": "battle_start",
            "allies": [
                { "id": "a", "name": "A", "hp": null, "maxHp": 100 },
                { "id": "b", "name": "B", "hp": 60, "maxHp": 60 }
            ],
            "enemies": [{ "id": "e", "name": "E", "hp": 40, "maxHp": null }]
        },
        {
            "type": "round",
            "number": 1,
            "actions": [{ "actor": "A", "skill": "Slash", "target": "E", "damage": null, "isCritical": null }],
            "remainingAllies": 2,
            "remainingEnemies": 1
        },
        { "type": "round", "number": 2, "actions": null, "remainingAllies": 2, "remainingEnemies": 0 }
    ]));

    assert_eq!(
        texts(&events),
        vec![
            "Battle initialized: 2 allies vs 1 enemy.",
            "The number of stages is unknown.",
            "Round 1 begins.",
            "A used Slash on E for 0 damage",
            "2 allies and 1 enemy remain.",
            "All enemies have been defeated this round!",
        ]
    );
    assert_eq!(replay(&events).current_round, 2);
}

#[test]
fn test_battle_summary_replaces_generated_line() {
    let events = events(json!([
        { "type": "battle_start", "allies": [], "enemies": [] },
        { "type": "battle_end", "victory": true, "summary": "The crypt falls silent." }
    ]));
    let lines = texts(&events);
    assert_eq!(lines.last().map(String::as_str), Some("The crypt falls silent."));
}
