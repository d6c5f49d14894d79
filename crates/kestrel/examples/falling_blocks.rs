//! Falling blocks — a headless run of a small platformer level.
//!
//! A possessed player ball runs right and jumps across two static ramps and a
//! spinning kinematic bar, while a grid of loose blocks tumbles down. Frames
//! are drawn into a `DrawList` instead of a window; a diagnostics snapshot is
//! printed at the end.
//!
//! Run with `RUST_LOG=debug` to see lifecycle logging.

use kestrel::diag::{self, Snapshot};
use kestrel::prelude::*;

const PLAYER_TEXTURE: TextureId = TextureId(1);
const BLOCK_TEXTURE: TextureId = TextureId(2);
const TILE_ATLAS: TextureId = TextureId(3);

const IDLE: [u32; 4] = [1, 2, 3, 4];
const RUN: [u32; 7] = [18, 19, 20, 21, 22, 23, 24];

/// Horizontal run speed in physics units per second.
const RUN_SPEED: f32 = 6.0;
/// Upward velocity applied on jump, physics units per second.
const JUMP_SPEED: f32 = 10.0;

const SCREEN: UVec2 = UVec2::new(1280, 720);
const FRAMES: u32 = 300;

// ── Entities ────────────────────────────────────────────────────────────

#[derive(Default)]
struct Player {
    move_dir: Vec2,
    jump: bool,
}

impl Behaviour for Player {
    fn load() {
        log::info!("Loading player sprite sheet");
    }

    fn initialize(&mut self, entity: &mut Entity, ctx: &mut Context) {
        entity.possessable = true;

        let sheet = SpriteSheet::new(24, 1, Vec2::new(576.0, 24.0));
        let mut animator = SpriteAnimator::new(PLAYER_TEXTURE, sheet).with_frames(IDLE.to_vec());
        animator.set_speed(2.0);
        animator.play();
        entity.add_component(ctx, animator);

        ctx.transforms
            .set_local_scale(entity.transform(), Vec2::splat(4.0));
        entity
            .create_sphere_physics(ctx, 32.0, BodyKind::Dynamic, 10.0, 1000.0)
            .expect("player world is registered");
        entity.activate_physics(ctx);
    }

    fn tick(&mut self, entity: &mut Entity, ctx: &mut Context) {
        let velocity = entity.velocity(ctx);
        let vy = if self.jump { -JUMP_SPEED } else { velocity.y };
        entity.set_velocity(ctx, Vec2::new(self.move_dir.x * RUN_SPEED, vy));

        if let Some(animator) = entity.get_component_mut::<SpriteAnimator>() {
            if self.move_dir.x < 0.0 {
                animator.flip_x = true;
            } else if self.move_dir.x > 0.0 {
                animator.flip_x = false;
            }
            let frames: &[u32] = if self.move_dir.x != 0.0 { &RUN } else { &IDLE };
            if animator.animation.frames != frames {
                animator.set_frames(frames.to_vec());
                animator.reset();
            }
        }

        self.move_dir = Vec2::ZERO;
        self.jump = false;
    }

    fn on_input_event(&mut self, _: &mut Entity, _: &mut Context, event: InputEvent) {
        let down = matches!(event.kind, InputEventType::Pressed | InputEventType::Held);
        match event.action {
            InputAction::Left if down => self.move_dir.x -= 1.0,
            InputAction::Right if down => self.move_dir.x += 1.0,
            InputAction::Jump if event.kind == InputEventType::Pressed => self.jump = true,
            _ => {}
        }
    }
}

/// Immovable box, sized in world units.
struct SolidBlock {
    size: Vec2,
}

impl Behaviour for SolidBlock {
    fn initialize(&mut self, entity: &mut Entity, ctx: &mut Context) {
        entity
            .create_box_physics(ctx, self.size, BodyKind::Static, 0.0, 0.0)
            .expect("block world is registered");
        entity.activate_physics(ctx);
    }
}

/// Bar spinning at a constant rate.
struct RotatingBlock {
    size: Vec2,
    speed: f32,
}

impl Behaviour for RotatingBlock {
    fn initialize(&mut self, entity: &mut Entity, ctx: &mut Context) {
        entity
            .create_box_physics(ctx, self.size, BodyKind::Kinematic, 0.0, 0.0)
            .expect("spinner world is registered");
        entity.set_angular_velocity(ctx, self.speed);
        entity.activate_physics(ctx);
    }
}

/// Loose crate that falls and gets drawn as a flat sprite.
struct FallingBlock;

impl Behaviour for FallingBlock {
    fn load() {
        log::info!("Loading block texture");
    }

    fn initialize(&mut self, entity: &mut Entity, ctx: &mut Context) {
        entity
            .create_box_physics(ctx, Vec2::splat(32.0), BodyKind::Dynamic, 1.0, 100.0)
            .expect("block world is registered");
        entity.activate_physics(ctx);
    }

    fn draw(&mut self, entity: &Entity, ctx: &Context, canvas: &mut dyn Canvas) {
        canvas.draw_sprite(
            &SpriteDraw::new(BLOCK_TEXTURE, entity.position(ctx), Vec2::splat(32.0))
                .with_rotation(entity.rotation(ctx))
                .with_origin(Vec2::splat(0.5)),
        );
    }
}

// ── Level ───────────────────────────────────────────────────────────────

struct Handles {
    controller: ControllerId,
    player: EntityId,
    camera: EntityId,
}

struct Level {
    map: TileMap,
    /// Raw device state for the next frame, filled in by the host.
    samples: Vec<InputSample>,
    handles: Option<Handles>,
}

impl Level {
    fn new() -> Self {
        let mut map = TileMap::new(8, 2, 16, 16, TILE_ATLAS, UVec2::new(64, 64)).with_scale(4);
        map.set_layer(MapLayer::Background, vec![1; 16]);
        map.set_layer(MapLayer::Collision, [vec![0; 8], vec![5; 8]].concat());
        Self {
            map,
            samples: Vec::new(),
            handles: None,
        }
    }
}

impl GameState for Level {
    fn register(&mut self, loaders: &mut LoadRegistry) {
        loaders.register::<Player>().register::<FallingBlock>();
    }

    fn initialize(&mut self, ctx: &mut Context) {
        let world = ctx.create_world("Test World").expect("fresh context");

        for i in 0..12 {
            for row in 0..4 {
                let at = Transform::from_xy(-200.0 + 40.0 * i as f32, -40.0 * row as f32);
                ctx.create_entity_with(world, FallingBlock, at, false)
                    .expect("world exists");
            }
        }

        let player = ctx
            .create_entity_with(world, Player::default(), Transform::from_xy(-200.0, 200.0), false)
            .expect("world exists");
        let camera = ctx
            .create_entity_with(
                world,
                (),
                Transform::from_xy(-200.0, 200.0).with_scale(Vec2::splat(1000.0)),
                false,
            )
            .expect("world exists");
        ctx.set_camera_entity(camera);

        ctx.start_world(world);

        let ramp = Vec2::new(1200.0, 10.0);
        ctx.create_entity_with(world, SolidBlock { size: ramp }, Transform::from_xy(-600.0, 400.0).with_rotation(0.3), true)
            .expect("world exists");
        ctx.create_entity_with(world, SolidBlock { size: ramp }, Transform::from_xy(600.0, 400.0).with_rotation(-0.3), true)
            .expect("world exists");
        ctx.create_entity_with(
            world,
            RotatingBlock { size: Vec2::new(300.0, 10.0), speed: 4.0 },
            Transform::from_xy(0.0, 700.0),
            true,
        )
        .expect("world exists");

        let controller = ctx.input.add_controller(InputController::new());
        assert!(
            ctx.possess(controller, player),
            "failed to attach input controller to player"
        );

        self.handles = Some(Handles { controller, player, camera });
    }

    fn tick(&mut self, ctx: &mut Context) {
        let Some(handles) = &self.handles else {
            return;
        };
        ctx.poll_input(handles.controller, &self.samples);

        let dt = ctx.time.delta_secs();
        ctx.tick_worlds(dt);

        // Ease the camera toward the player.
        let (Some(target), Some(camera)) = (
            ctx.entity(handles.player).map(|p| p.position(ctx)),
            ctx.entity(handles.camera).map(|c| c.transform()),
        ) else {
            return;
        };
        let Some(current) = ctx.transforms.world_position(camera, &ctx.physics) else {
            return;
        };
        let next = current.lerp(target, (2.0 * dt).min(1.0));
        ctx.transforms
            .set_local_position(camera, next, &mut ctx.physics);
        let sway = (ctx.time.elapsed_secs() * 1.25).sin() / 64.0;
        ctx.transforms
            .set_local_rotation(camera, sway, &mut ctx.physics);
    }

    fn draw(&mut self, ctx: &mut Context, canvas: &mut dyn Canvas) {
        self.map.draw_layer(canvas, MapLayer::Background);
        self.map.draw_layer(canvas, MapLayer::Collision);
        ctx.draw_worlds(canvas);
        self.map.draw_layer(canvas, MapLayer::Lights);
        self.map.draw_layer(canvas, MapLayer::Entities);
    }

    fn draw_ui(&mut self, ctx: &mut Context, canvas: &mut dyn Canvas) {
        ctx.draw_ui_worlds(canvas);
        canvas.draw_sprite(
            &SpriteDraw::new(TextureId(0), Vec2::new(10.0, 10.0), Vec2::new(500.0, 100.0))
                .with_color(Color::rgb(0.0, 0.5, 0.0)),
        );
    }
}

/// Scripted input: run right for two seconds, jumping once along the way.
fn script(frame: u32) -> Vec<InputSample> {
    vec![
        InputSample::Button { action: InputAction::Right, down: (30..150).contains(&frame) },
        InputSample::Button { action: InputAction::Jump, down: (60..64).contains(&frame) },
    ]
}

fn main() {
    diag::init_logger();

    let mut game = Game::new(Level::new());
    let mut canvas = DrawList::new();

    for frame in 0..FRAMES {
        game.state.samples = script(frame);
        canvas.clear();
        game.frame(1.0 / 60.0, &mut canvas, SCREEN);

        if frame % 60 == 0 {
            if let Some(handles) = &game.state.handles {
                let player = game.ctx.entity(handles.player).map(|p| p.position(&game.ctx));
                log::info!("frame {frame}: player at {player:?}, {} sprites", canvas.len());
            }
        }
    }

    match Snapshot::capture(&game.ctx).to_json() {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("Failed to serialize snapshot: {err}"),
    }
}
