//! State-machine scenarios driven tick by tick with fake probe and launcher.

mod common;

use common::{game_chain, midday, sequencer, CompletionCounter, FakeLauncher, FakeProbe};
use stagechain_core::config::{ChainConfig, KillTargets, Stage};
use stagechain_core::sequencer::TickKind;
use stagechain_core::{Phase, StagechainError};
use std::sync::Arc;

#[test]
fn test_two_game_chain_runs_to_completion() {
    let probe = FakeProbe::new();
    let launcher = FakeLauncher::recording();
    let (mut seq, _) = sequencer(
        game_chain(2).with_launch_interval(5),
        probe.clone(),
        launcher.clone(),
    );

    probe.start_process("g1.exe");
    seq.tick(midday());
    assert_eq!(seq.phase(), Phase::Monitoring { index: 0 });

    probe.exit_process("g1.exe");
    seq.tick(midday());
    assert_eq!(
        seq.phase(),
        Phase::AwaitingInterval {
            index: 1,
            remaining_secs: 5
        }
    );

    for _ in 0..5 {
        assert_eq!(seq.tick(midday()), TickKind::Countdown);
    }
    assert_eq!(launcher.launched(), vec!["Game2"]);
    assert_eq!(seq.phase(), Phase::AwaitingLaunchConfirmation { index: 1 });

    probe.start_process("g2.exe");
    seq.tick(midday());
    assert_eq!(seq.phase(), Phase::Monitoring { index: 1 });

    probe.exit_process("g2.exe");
    seq.tick(midday());
    assert_eq!(seq.phase(), Phase::Standby);
}

#[test]
fn test_empty_chain_never_leaves_standby() {
    let probe = FakeProbe::new();
    let launcher = FakeLauncher::recording();
    let (mut seq, _) = sequencer(
        ChainConfig::default().with_kill_targets(KillTargets::new(["x.exe"])),
        probe.clone(),
        launcher.clone(),
    );

    probe.start_process("g1.exe");
    for _ in 0..10 {
        assert_eq!(seq.tick(midday()), TickKind::Poll);
        assert_eq!(seq.phase(), Phase::Standby);
    }
    assert!(!seq.skip());
    assert!(probe.sweeps().is_empty());
    assert!(launcher.launched().is_empty());
}

#[test]
fn test_skip_single_stage_completes_with_auto_exit() {
    let probe = FakeProbe::new();
    let launcher = FakeLauncher::recording();
    let counter = CompletionCounter::default();
    let (mut seq, _) = sequencer(
        game_chain(1).with_auto_exit(true),
        probe.clone(),
        launcher,
    );
    seq.set_completion_handler(Arc::new(counter.handler()));

    seq.start(0, false).unwrap();
    assert_eq!(seq.phase(), Phase::AwaitingLaunchConfirmation { index: 0 });

    assert!(seq.skip());
    assert_eq!(seq.phase(), Phase::Standby);
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_skip_single_stage_without_auto_exit_is_silent() {
    let probe = FakeProbe::new();
    let counter = CompletionCounter::default();
    let (mut seq, _) = sequencer(game_chain(1), probe, FakeLauncher::recording());
    seq.set_completion_handler(Arc::new(counter.handler()));

    seq.start(0, false).unwrap();
    seq.skip();
    assert_eq!(seq.phase(), Phase::Standby);
    assert_eq!(counter.count(), 0);
}

#[test]
fn test_exit_in_every_middle_stage_schedules_next() {
    let n = 4;
    for i in 0..n - 1 {
        let probe = FakeProbe::new();
        let (mut seq, _) = sequencer(
            game_chain(n).with_launch_interval(9),
            probe.clone(),
            FakeLauncher::starting(probe.clone()),
        );

        seq.start(i, true).unwrap();
        seq.tick(midday());
        assert_eq!(seq.phase(), Phase::Monitoring { index: i });

        probe.exit_process(&format!("g{}.exe", i + 1));
        seq.tick(midday());
        assert_eq!(
            seq.phase(),
            Phase::AwaitingInterval {
                index: i + 1,
                remaining_secs: 9
            }
        );
    }
}

#[test]
fn test_exit_of_last_or_single_stage_completes() {
    for (index, chain_launch) in [(2, true), (0, false), (1, false)] {
        for auto_exit in [true, false] {
            let probe = FakeProbe::new();
            let counter = CompletionCounter::default();
            let (mut seq, _) = sequencer(
                game_chain(3).with_auto_exit(auto_exit),
                probe.clone(),
                FakeLauncher::starting(probe.clone()),
            );
            seq.set_completion_handler(Arc::new(counter.handler()));

            seq.start(index, chain_launch).unwrap();
            seq.tick(midday());
            probe.exit_process(&format!("g{}.exe", index + 1));
            seq.tick(midday());

            assert_eq!(seq.phase(), Phase::Standby);
            assert_eq!(counter.count(), usize::from(auto_exit));
        }
    }
}

#[test]
fn test_skip_matches_exit_path_from_every_phase() {
    for reach_monitoring in [false, true] {
        let probe = FakeProbe::new();
        let (mut seq, _) = sequencer(
            game_chain(3).with_launch_interval(5),
            probe.clone(),
            FakeLauncher::recording(),
        );
        if reach_monitoring {
            probe.start_process("g1.exe");
            seq.tick(midday());
            assert_eq!(seq.phase(), Phase::Monitoring { index: 0 });
        } else {
            seq.start(0, true).unwrap();
            assert_eq!(seq.phase(), Phase::AwaitingLaunchConfirmation { index: 0 });
        }

        assert!(seq.skip());
        assert_eq!(
            seq.phase(),
            Phase::AwaitingInterval {
                index: 1,
                remaining_secs: 5
            }
        );
    }
}

#[test]
fn test_skip_during_interval_moves_past_pending_stage() {
    let probe = FakeProbe::new();
    let launcher = FakeLauncher::recording();
    let (mut seq, _) = sequencer(
        game_chain(3).with_launch_interval(5),
        probe.clone(),
        launcher.clone(),
    );

    probe.start_process("g1.exe");
    seq.tick(midday());
    seq.skip();
    seq.tick(midday());
    assert_eq!(
        seq.phase(),
        Phase::AwaitingInterval {
            index: 1,
            remaining_secs: 4
        }
    );

    seq.skip();
    assert_eq!(
        seq.phase(),
        Phase::AwaitingInterval {
            index: 2,
            remaining_secs: 5
        }
    );
    assert!(launcher.launched().is_empty());
}

#[test]
fn test_kill_targets_swept_on_detection_exit_and_skip() {
    let probe = FakeProbe::new();
    let (mut seq, _) = sequencer(
        game_chain(2).with_kill_targets(KillTargets::new(["HoYoPlay (HoYoPlay.exe)", "none"])),
        probe.clone(),
        FakeLauncher::recording(),
    );

    probe.start_process("hoyoplay.exe");
    probe.start_process("g1.exe");
    seq.tick(midday());
    assert_eq!(probe.sweeps().len(), 1);
    assert_eq!(probe.sweeps()[0], vec!["hoyoplay.exe"]);

    probe.exit_process("g1.exe");
    seq.tick(midday());
    assert_eq!(probe.sweeps().len(), 2);

    seq.skip();
    assert_eq!(probe.sweeps().len(), 3);
}

#[test]
fn test_sentinel_only_kill_targets_never_sweep() {
    let probe = FakeProbe::new();
    let (mut seq, _) = sequencer(
        game_chain(2).with_kill_targets(KillTargets::new(["none", ""])),
        probe.clone(),
        FakeLauncher::recording(),
    );

    probe.start_process("g1.exe");
    seq.tick(midday());
    probe.exit_process("g1.exe");
    seq.tick(midday());
    assert!(probe.sweeps().is_empty());
}

#[test]
fn test_failed_launch_still_awaits_confirmation() {
    let probe = FakeProbe::new();
    let launcher = FakeLauncher::recording();
    launcher.set_failing(true);
    let (mut seq, _) = sequencer(game_chain(2), probe.clone(), launcher.clone());

    let result = seq.start(1, true);
    assert!(matches!(result, Err(StagechainError::Launch { ref stage, .. }) if stage == "Game2"));
    assert_eq!(seq.phase(), Phase::AwaitingLaunchConfirmation { index: 1 });

    // The user starts it by hand.
    probe.start_process("g2.exe");
    seq.tick(midday());
    assert_eq!(seq.phase(), Phase::Monitoring { index: 1 });
}

#[test]
fn test_countdown_launch_failure_is_not_fatal() {
    let probe = FakeProbe::new();
    let launcher = FakeLauncher::recording();
    let (mut seq, _) = sequencer(
        game_chain(2).with_launch_interval(1),
        probe.clone(),
        launcher.clone(),
    );

    probe.start_process("g1.exe");
    seq.tick(midday());
    probe.exit_process("g1.exe");
    seq.tick(midday());

    launcher.set_failing(true);
    assert_eq!(seq.tick(midday()), TickKind::Countdown);
    assert_eq!(seq.phase(), Phase::AwaitingLaunchConfirmation { index: 1 });
    assert_eq!(launcher.launched(), vec!["Game2"]);
}

#[test]
fn test_zero_interval_launches_in_the_exit_tick() {
    let probe = FakeProbe::new();
    let launcher = FakeLauncher::recording();
    let (mut seq, _) = sequencer(
        game_chain(3).with_launch_interval(0),
        probe.clone(),
        launcher.clone(),
    );

    probe.start_process("g1.exe");
    seq.tick(midday());
    probe.exit_process("g1.exe");
    seq.tick(midday());
    assert_eq!(seq.phase(), Phase::AwaitingLaunchConfirmation { index: 1 });
    assert_eq!(launcher.launched(), vec!["Game2"]);

    // Skipping behaves the same way.
    assert!(seq.skip());
    assert_eq!(seq.phase(), Phase::AwaitingLaunchConfirmation { index: 2 });
    assert_eq!(launcher.launched(), vec!["Game2", "Game3"]);
}

#[test]
fn test_process_names_match_case_insensitively() {
    let probe = FakeProbe::new();
    let (mut seq, _) = sequencer(
        ChainConfig::new(vec![Stage::new("Game", "/g/Game.exe", "Game.EXE")]),
        probe.clone(),
        FakeLauncher::recording(),
    );

    probe.start_process("game.exe");
    seq.tick(midday());
    assert_eq!(seq.phase(), Phase::Monitoring { index: 0 });
}

#[test]
fn test_reload_mid_chain_keeps_pinned_stages() {
    let probe = FakeProbe::new();
    let launcher = FakeLauncher::recording();
    let (mut seq, handle) = sequencer(
        game_chain(2).with_launch_interval(1),
        probe.clone(),
        launcher.clone(),
    );

    probe.start_process("g1.exe");
    seq.tick(midday());

    handle.replace(ChainConfig::new(vec![
        Stage::new("Other", "/o/o.exe", "o.exe"),
        Stage::new("Replacement", "/r/r.exe", "r.exe"),
        Stage::new("Third", "/t/t.exe", "t.exe"),
    ]));

    probe.exit_process("g1.exe");
    seq.tick(midday());
    seq.tick(midday());
    assert_eq!(launcher.launched(), vec!["Game2"]);
    assert_eq!(seq.chain().len(), 2);

    seq.reset();
    seq.tick(midday());
    assert_eq!(seq.chain().len(), 3);
    assert_eq!(seq.chain().stages()[0].name, "Other");
}

#[test]
fn test_start_overrides_any_phase() {
    let probe = FakeProbe::new();
    let (mut seq, _) = sequencer(game_chain(3), probe.clone(), FakeLauncher::recording());

    probe.start_process("g1.exe");
    seq.tick(midday());
    assert_eq!(seq.phase(), Phase::Monitoring { index: 0 });

    seq.start(2, false).unwrap();
    assert_eq!(seq.phase(), Phase::AwaitingLaunchConfirmation { index: 2 });
    assert!(!seq.chain_launch_active());
}

#[test]
fn test_returning_to_standby_releases_pinned_chain() {
    let probe = FakeProbe::new();
    let (mut seq, handle) = sequencer(
        game_chain(2).with_auto_exit(true),
        probe.clone(),
        FakeLauncher::starting(probe.clone()),
    );

    seq.start(0, true).unwrap();
    handle.replace(ChainConfig::default());
    assert_eq!(seq.chain().len(), 2);
    seq.reset();
    assert!(seq.chain().is_empty());

    handle.replace(game_chain(1).with_auto_exit(true));
    seq.start(0, false).unwrap();
    seq.tick(midday());
    handle.replace(game_chain(3));
    probe.exit_process("g1.exe");
    seq.tick(midday());
    assert_eq!(seq.phase(), Phase::Standby);
    assert_eq!(seq.chain().len(), 3);
}
