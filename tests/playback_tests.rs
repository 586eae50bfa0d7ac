//! Playback Tests
//!
//! Tests for:
//! - One-time animations and their end tick
//! - Repeated requests of the running action
//! - Stepped playback through the frame rate setting
//! - Start offsets, action fallback and playback callbacks
//! - Facing held by NO_ROTATE
//! - Redraw bookkeeping and the global speed multiplier

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use fo3d::model::{AnimationFlags, ModelManager};
use fo3d::settings::ModelSettings;

use common::{DEATH, IDLE, WALK, manager, manager_with};

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() < eps
}

fn advance(mgr: &mut ModelManager, ms: u64) {
    mgr.timer_mut().advance(Duration::from_millis(ms));
}

// ============================================================================
// Action switching
// ============================================================================

#[test]
fn one_time_animation_ends_after_its_duration() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    assert!(!human.is_animation_playing(&mgr));

    human.set_animation(&mut mgr, DEATH.0, DEATH.1, None, AnimationFlags::ONE_TIME);
    assert_eq!(human.anim_duration(), 500);
    assert!(human.is_animation_playing(&mgr));

    advance(&mut mgr, 499);
    assert!(human.is_animation_playing(&mgr));
    advance(&mut mgr, 1);
    assert!(!human.is_animation_playing(&mgr));
}

#[test]
fn one_time_duration_scales_with_speed() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    human.set_speed(2.0);

    human.set_animation(&mut mgr, DEATH.0, DEATH.1, None, AnimationFlags::ONE_TIME);
    advance(&mut mgr, 249);
    assert!(human.is_animation_playing(&mgr));
    advance(&mut mgr, 1);
    assert!(!human.is_animation_playing(&mgr));
}

#[test]
fn stopped_model_never_finishes_one_time_animation() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    advance(&mut mgr, 5);
    human.set_speed(0.0);

    human.set_animation(&mut mgr, DEATH.0, DEATH.1, None, AnimationFlags::ONE_TIME);
    advance(&mut mgr, 60_000);
    assert!(human.is_animation_playing(&mgr));
}

#[test]
fn no_rotate_defers_facing_until_cleared() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    human.set_dir_angle(60);
    assert_eq!(human.dir_angle(), 120.0);

    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::NO_ROTATE);
    human.set_dir_angle(90);
    assert_eq!(human.dir_angle(), 120.0);
    // Hex direction 0 is 30 degrees on screen
    human.set_dir(0);
    assert_eq!(human.dir_angle(), 120.0);

    // Still held while the flag stays set
    human.set_animation(&mut mgr, IDLE.0, IDLE.1, None, AnimationFlags::NO_ROTATE);
    assert_eq!(human.dir_angle(), 120.0);

    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::empty());
    assert_eq!(human.dir_angle(), 150.0);
    human.set_dir_angle(0);
    assert_eq!(human.dir_angle(), 180.0);
}

#[test]
fn looping_animation_never_reports_playing() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::empty());
    assert!(!human.is_animation_playing(&mgr));
}

#[test]
fn repeating_the_running_action_keeps_playback() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();

    human.set_animation(&mut mgr, IDLE.0, IDLE.1, None, AnimationFlags::empty());
    human.draw(&mgr, &mut renderer);
    advance(&mut mgr, 300);
    human.draw(&mgr, &mut renderer);
    let before = human.playback_time();
    assert!(approx(before, 0.3001, 1e-3), "got {before}");

    assert!(!human.set_animation(&mut mgr, IDLE.0, IDLE.1, None, AnimationFlags::empty()));
    assert!(approx(human.playback_time(), before, 1e-6));

    // A one-time request restarts even the same action
    human.set_animation(&mut mgr, IDLE.0, IDLE.1, None, AnimationFlags::ONE_TIME);
    assert!(human.playback_time() < 0.01);
}

#[test]
fn unknown_action_falls_back_to_idle() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();

    human.set_animation(&mut mgr, 1, 99, None, AnimationFlags::empty());
    assert_eq!(human.anim_duration(), 1000);
    assert_eq!(human.anim2(), 99);

    human.set_animation(&mut mgr, 7, 3, None, AnimationFlags::empty());
    assert_eq!(human.anim_duration(), 2000);
}

#[test]
fn period_flag_starts_inside_the_clip() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();

    human.set_animation(
        &mut mgr,
        WALK.0,
        WALK.1,
        None,
        AnimationFlags::period(50) | AnimationFlags::NO_SMOOTH,
    );
    human.draw(&mgr, &mut renderer);
    assert!(approx(human.anim_pos_proc(), 0.5, 0.01), "got {}", human.anim_pos_proc());
    assert!(approx(human.anim_pos_time(), 1.0, 0.01));
}

// ============================================================================
// Clock
// ============================================================================

#[test]
fn stepped_playback_advances_in_whole_frames() {
    let mut mgr = manager_with(ModelSettings {
        animation_3d_fps: 10,
        ..Default::default()
    });
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();

    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::NO_SMOOTH);
    human.draw(&mgr, &mut renderer);
    let start = human.playback_time();

    advance(&mut mgr, 16);
    human.draw(&mgr, &mut renderer);
    assert!(approx(human.playback_time(), start, 1e-6));

    advance(&mut mgr, 104);
    human.draw(&mgr, &mut renderer);
    assert!(approx(human.playback_time() - start, 0.1, 1e-4));

    // The 20 ms remainder counts towards the next step
    advance(&mut mgr, 80);
    human.draw(&mgr, &mut renderer);
    assert!(approx(human.playback_time() - start, 0.2, 1e-4));
}

#[test]
fn smooth_playback_follows_the_clock() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();

    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::NO_SMOOTH);
    human.draw(&mgr, &mut renderer);
    let start = human.playback_time();

    advance(&mut mgr, 16);
    human.draw(&mgr, &mut renderer);
    assert!(approx(human.playback_time() - start, 0.016, 1e-4));
}

#[test]
fn paused_game_time_freezes_playback() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();

    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::NO_SMOOTH);
    human.draw(&mgr, &mut renderer);
    let start = human.playback_time();

    mgr.timer_mut().set_game_paused(true);
    advance(&mut mgr, 500);
    human.draw(&mgr, &mut renderer);
    assert!(approx(human.playback_time(), start, 1e-6));
}

#[test]
fn global_speed_scales_playback() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();

    mgr.animate_faster();
    assert!(approx(mgr.global_speed_adjust(), 1.1, 1e-5));

    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::NO_SMOOTH);
    human.draw(&mgr, &mut renderer);
    let start = human.playback_time();
    advance(&mut mgr, 1000);
    human.draw(&mgr, &mut renderer);
    assert!(approx(human.playback_time() - start, 1.1, 1e-3));
}

// ============================================================================
// Callbacks
// ============================================================================

#[test]
fn callbacks_fire_once_per_cycle() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();

    let walk_hits = Rc::new(Cell::new(0));
    let idle_hits = Rc::new(Cell::new(0));
    {
        let hits = Rc::clone(&walk_hits);
        human.add_animation_callback(WALK.0, WALK.1, 0.5, move || hits.set(hits.get() + 1));
        let hits = Rc::clone(&idle_hits);
        human.add_animation_callback(IDLE.0, IDLE.1, 0.5, move || hits.set(hits.get() + 1));
    }

    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::NO_SMOOTH);
    human.draw(&mgr, &mut renderer);

    let mut seen = Vec::new();
    for _ in 0..5 {
        advance(&mut mgr, 600);
        human.draw(&mgr, &mut renderer);
        seen.push(walk_hits.get());
    }
    assert_eq!(seen, vec![0, 1, 1, 1, 2]);
    assert_eq!(idle_hits.get(), 0);
}

// ============================================================================
// Redraw bookkeeping
// ============================================================================

#[test]
fn need_draw_tracks_frame_steps() {
    let mut mgr = manager_with(ModelSettings {
        animation_3d_fps: 10,
        ..Default::default()
    });
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();
    human.start_mesh_generation();
    assert!(human.need_draw(&mgr));

    human.draw(&mgr, &mut renderer);
    assert!(!human.need_draw(&mgr));

    advance(&mut mgr, 50);
    assert!(!human.need_draw(&mgr));
    advance(&mut mgr, 50);
    assert!(human.need_draw(&mgr));

    human.draw(&mgr, &mut renderer);
    assert!(!human.need_draw(&mgr));
    human.set_animation(&mut mgr, WALK.0, WALK.1, None, AnimationFlags::empty());
    assert!(human.need_draw(&mgr));
}

#[test]
fn was_drawn_resets_every_scene() {
    let mut mgr = manager();
    let mut human = mgr.create_model("human.fo3d").unwrap();
    let mut renderer = common::RecordingRenderer::default();

    mgr.begin_scene();
    assert!(!human.was_drawn(&mgr));
    human.draw(&mgr, &mut renderer);
    assert!(human.was_drawn(&mgr));

    mgr.begin_scene();
    assert!(!human.was_drawn(&mgr));
}
