//! Window demo: a coloured room with a few sprites, cycling show styles.
//!
//! ```bash
//! cargo run --release -- [--config engine.json] [--zoom 4]
//! ```
//!
//! Space scrolls a picture in from the right, Escape quits.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};
use once_cell::sync::Lazy;

use plane32_rs::{
    EngineConfig, Graphics, Services,
    cel::{CelBank, CelImage, PicCel},
    engine::{ScrollRequest, ShowStyleRequest, ShowStyleType},
    geometry::Point,
    renderer::{Display, Palette, Rgb, Rgba, SoftPalette, SystemClock},
    vm::{MemoryObjectStore, ObjectId, Selector},
};

#[derive(Parser)]
#[command(about = "Cycle show styles over a small scene")]
struct Args {
    /// Engine configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Window scale: 1, 2, 4 or 8.
    #[arg(long, default_value_t = 2)]
    zoom: u8,
    /// Seconds each show style takes.
    #[arg(long, default_value_t = 1)]
    seconds: i16,
}

const PLANE: ObjectId = ObjectId(1);
const SPRITE_VIEW: i32 = 100;
const ROOM_PICTURE: i32 = 200;
const NIGHT_PICTURE: i32 = 201;
const FRAMES_PER_STYLE: u32 = 150;

/// 16 hues × 16 shades.
static DEMO_PALETTE: Lazy<Palette> = Lazy::new(|| {
    let mut palette = Palette::default();
    for (i, c) in palette.colors.iter_mut().enumerate() {
        let hue = (i / 16) as u32;
        let shade = (i % 16) as u32 * 17;
        *c = Rgb::new(
            (shade * ((hue & 1) + 1) / 2) as u8,
            (shade * (((hue >> 1) & 1) + 1) / 2) as u8,
            (shade * (((hue >> 2) & 1) + 1) / 2) as u8,
        );
    }
    palette
});

/// Keeps an index-colour copy of the screen and presents it through the
/// current hardware palette, so fades show without pixel changes.
struct WindowDisplay {
    window: Window,
    palette: Rc<RefCell<SoftPalette>>,
    width: usize,
    indices: Vec<u8>,
    frame: Vec<Rgba>,
}

impl Display for WindowDisplay {
    fn copy_rect_to_screen(&mut self, buffer: &[u8], pitch: usize, x: i32, y: i32, w: i32, h: i32) {
        for row in 0..h as usize {
            let src = &buffer[row * pitch..row * pitch + w as usize];
            let dst = (y as usize + row) * self.width + x as usize;
            self.indices[dst..dst + w as usize].copy_from_slice(src);
        }
    }

    fn update_screen(&mut self) {
        let palette = self.palette.borrow();
        let hw = palette.hardware();
        for (px, &i) in self.frame.iter_mut().zip(&self.indices) {
            *px = hw[i as usize];
        }
        let height = self.indices.len() / self.width;
        if let Err(e) = self.window.update_with_buffer(&self.frame, self.width, height) {
            log::error!("present failed: {e}");
        }
    }
}

fn cels() -> CelBank {
    let mut bank = CelBank::new();
    bank.insert_view(
        SPRITE_VIEW,
        vec![(0..8).map(|n| CelImage::solid(12 + n * 4, 16 + n * 2, 16 * (n as u8 + 1) + 12)).collect()],
    );

    bank.insert_picture(ROOM_PICTURE, room(16 * 3 + 4, 16 * 6 + 5));
    bank.insert_picture(NIGHT_PICTURE, room(16 * 4 + 3, 16 * 2 + 2));
    bank
}

/// Back wall over a floor.
fn room(wall: u8, floor: u8) -> Vec<(PicCel, CelImage)> {
    vec![
        (
            PicCel {
                priority: 0,
                relative_position: Point::new(0, 0),
            },
            CelImage::solid(320, 120, wall),
        ),
        (
            PicCel {
                priority: 0,
                relative_position: Point::new(0, 120),
            },
            CelImage::solid(320, 80, floor),
        ),
    ]
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

const STYLES: [ShowStyleType; 8] = [
    ShowStyleType::WipeLeft,
    ShowStyleType::HShutterOut,
    ShowStyleType::IrisIn,
    ShowStyleType::Dissolve,
    ShowStyleType::VShutterIn,
    ShowStyleType::WipeDown,
    ShowStyleType::IrisOut,
    ShowStyleType::FadeOut,
];

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    let (w, h) = (config.screen_width as usize, config.screen_height as usize);

    let scale = match args.zoom {
        1 => Scale::X1,
        4 => Scale::X4,
        8 => Scale::X8,
        _ => Scale::X2,
    };
    let window = Window::new(
        "plane32 transitions",
        w,
        h,
        WindowOptions {
            scale,
            ..WindowOptions::default()
        },
    )?;

    let palette = Rc::new(RefCell::new(SoftPalette::new(DEMO_PALETTE.clone())));
    let display = Rc::new(RefCell::new(WindowDisplay {
        window,
        palette: palette.clone(),
        width: w,
        indices: vec![0; w * h],
        frame: vec![0; w * h],
    }));

    let mut gfx = Graphics::new(
        config,
        Services {
            cels: Box::new(cels()),
            palette: Box::new(palette.clone()),
            display: Box::new(display.clone()),
            clock: Box::new(SystemClock::new()),
        },
    );

    let mut objects = MemoryObjectStore::new();
    objects.set(
        PLANE,
        &[
            (Selector::Picture, ROOM_PICTURE),
            (Selector::Back, 0),
            (Selector::InRight, 319),
            (Selector::InBottom, 199),
        ],
    );
    gfx.kernel_add_plane(&objects, PLANE)?;

    let sprites: Vec<ObjectId> = (0..8u32)
        .map(|n| {
            let id = ObjectId(10 + n);
            objects.set(
                id,
                &[
                    (Selector::Plane, PLANE.0 as i32),
                    (Selector::X, 20 + n as i32 * 36),
                    (Selector::Y, 150 + (n as i32 % 3) * 12),
                    (Selector::View, SPRITE_VIEW),
                    (Selector::Cel, n as i32),
                ],
            );
            id
        })
        .collect();
    for &id in &sprites {
        gfx.kernel_add_screen_item(&mut objects, id)?;
    }

    let mut frame_no = 0u32;
    let mut style = 0usize;
    let mut covering = true;
    let mut picture = ROOM_PICTURE;

    loop {
        {
            let d = display.borrow();
            if !d.window.is_open() || d.window.is_key_down(Key::Escape) {
                break;
            }
        }
        let scroll_key = display.borrow().window.is_key_pressed(Key::Space, KeyRepeat::No);

        // sprites drift right and wrap
        for (n, &id) in sprites.iter().enumerate() {
            let x = objects.get(id, Selector::X);
            let step = 1 + n as i32 % 3;
            objects.set(id, &[(Selector::X, if x > 330 { -30 } else { x + step })]);
            gfx.kernel_update_screen_item(&mut objects, id)?;
        }

        if scroll_key && gfx.scrolls().is_empty() {
            picture = if picture == ROOM_PICTURE { NIGHT_PICTURE } else { ROOM_PICTURE };
            gfx.kernel_set_scroll(ScrollRequest {
                plane: PLANE,
                dx: -8,
                dy: 0,
                picture,
                animate: true,
                mirrored: false,
            })?;
        }

        if frame_no % FRAMES_PER_STYLE == FRAMES_PER_STYLE - 1 {
            let kind = if covering {
                STYLES[style]
            } else if STYLES[style] == ShowStyleType::FadeOut {
                ShowStyleType::FadeIn
            } else {
                STYLES[style]
            };
            let mut req = ShowStyleRequest::new(PLANE, kind, args.seconds);
            if covering {
                req.back_color = 0;
            } else {
                style = (style + 1) % STYLES.len();
            }
            log::info!("{:?} ({})", kind, if covering { "cover" } else { "reveal" });
            gfx.kernel_set_show_style(req)?;
            covering = !covering;
        }

        gfx.kernel_frame_out(true)?;
        frame_no += 1;
    }

    log::info!("{frame_no} frames");
    Ok(())
}
