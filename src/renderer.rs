use std::{
    collections::{BTreeSet, HashMap},
    sync::Mutex,
};

use macroquad::prelude::*;
use water_sort::{FluidContainer, FluidPacket};

use crate::gameplay::Button;

pub const FLUID_COLORS: [Color; 32] = [
    Color::new(1.0  , 0.0  , 0.0  , 1.0  ), //RED
    Color::new(0.0  , 0.0  , 1.0  , 1.0  ), //BLUE
    Color::new(1.0  , 1.0  , 0.0  , 1.0  ), //YELLOW
    Color::new(0.0  , 0.5  , 0.0  , 1.0  ), //GREEN
    Color::new(0.627, 0.125, 0.941, 1.0  ), //PURPLE
    Color::new(1.0  , 0.647, 0.0  , 1.0  ), //ORANGE
    Color::new(0.0  , 1.0  , 1.0  , 1.0  ), //CYAN
    Color::new(1.0  , 0.0  , 1.0  , 1.0  ), //MAGENTA
    Color::new(0.0  , 1.0  , 0.0  , 1.0  ), //LIME
    Color::new(1.0  , 0.752, 0.796, 1.0  ), //PINK
    Color::new(0.647, 0.164, 0.164, 1.0  ), //BROWN
    Color::new(0.0  , 0.0  , 0.5  , 1.0  ), //NAVY
    Color::new(0.250, 0.878, 0.815, 1.0  ), //TURQUOISE
    Color::new(0.5  , 0.5  , 0.0  , 1.0  ), //OLIVE
    Color::new(0.5  , 0.0  , 0.0  , 1.0  ), //MAROON
    Color::new(0.0  , 1.0  , 1.0  , 1.0  ), //AQUA
    Color::new(0.0  , 0.5  , 0.5  , 1.0  ), //TEAL
    Color::new(1.0  , 0.843, 0.0  , 1.0  ), //GOLD
    Color::new(0.75 , 0.75 , 0.75 , 1.0  ), //SILVER
    Color::new(1.0  , 0.498, 0.313, 1.0  ), //CORAL
    Color::new(0.933, 0.509, 0.933, 1.0  ), //VIOLET
    Color::new(0.596, 1.0  , 0.596, 1.0  ), //MINT
    Color::new(0.960, 0.960, 0.862, 1.0  ), //BEIGE
    Color::new(0.980, 0.501, 0.447, 1.0  ), //SALMON
    Color::new(0.956, 0.643, 0.376, 1.0  ), //SANDYBROWN
    Color::new(0.294, 0.0  , 0.509, 1.0  ), //INDIGO
    Color::new(0.862, 0.078, 0.235, 1.0  ), //CRIMSON
    Color::new(0.941, 0.901, 0.549, 1.0  ), //KHAKI
    Color::new(0.866, 0.627, 0.866, 1.0  ), //PLUM
    Color::new(0.823, 0.411, 0.117, 1.0  ), //CHOCOLATE
    Color::new(0.0  , 0.392, 0.0  , 1.0  ), //DARKGREEN
    Color::new(1.0  , 0.549, 0.0  , 1.0  ), //DARKORANGE
];

pub fn packet_color(packet: &FluidPacket) -> Color {
    FLUID_COLORS[packet.get_color_id() % FLUID_COLORS.len()]
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HitItem {
    Button { index: usize },
    Container { index: usize },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitRecord {
    pub rect: Rect,
    pub item: HitItem,
}

#[derive(Default)]
pub struct HitTestRegistry {
    items: Vec<HitRecord>,
}

impl HitTestRegistry {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, rect: Rect, item: HitItem) {
        self.items.push(HitRecord { rect, item });
    }

    /// Returns the topmost item under the point (last drawn wins).
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&HitRecord> {
        self.items
            .iter()
            .rev()
            .find(|r| r.rect.contains(vec2(x, y)))
    }
}

#[derive(Hash, PartialEq, Eq, Clone, Debug)]
struct TextCacheKey {
    text: String,
    w_px: u16,
    h_px: u16,
}
type TextMaxSize = (f32, f32, f32);
pub struct CachedTextSizer {
    final_size_cache: Mutex<HashMap<TextCacheKey, TextMaxSize>>,
    unscaled_size_cache: Mutex<HashMap<String, (f32, f32)>>,
}

impl CachedTextSizer {
    pub fn new() -> Self {
        Self {
            final_size_cache: Mutex::new(HashMap::new()),
            unscaled_size_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_text_max_size(&self, text: &str, rect_width: f32, rect_height: f32) -> TextMaxSize {
        let w_px = rect_width.round().clamp(0.0, u16::MAX as f32) as u16;
        let h_px = rect_height.round().clamp(0.0, u16::MAX as f32) as u16;

        let key = TextCacheKey {
            text: text.to_string(),
            w_px,
            h_px,
        };

        if let Ok(cache) = self.final_size_cache.lock()
            && let Some(cached_size) = cache.get(&key)
        {
            return *cached_size;
        }

        let text_size = self.measure(text, rect_width, rect_height);
        if let Ok(mut cache) = self.final_size_cache.lock() {
            cache.insert(key, text_size);
        }
        text_size
    }

    fn measure(&self, text: &str, rect_width: f32, rect_height: f32) -> TextMaxSize {
        let reference_size = 100u16;

        let (size_x, size_y) = if let Ok(cache) = self.unscaled_size_cache.lock()
            && let Some(dimensions) = cache.get(text)
        {
            *dimensions
        } else {
            let dimensions = measure_text(text, None, reference_size, 1.0);
            if let Ok(mut cache) = self.unscaled_size_cache.lock() {
                cache.insert(text.to_string(), (dimensions.width, dimensions.height));
            }
            (dimensions.width, dimensions.height)
        };
        let scale = (rect_width / size_x).min(rect_height / size_y);
        let optimal_size = reference_size as f32 * scale;
        let offset_x = (rect_width - size_x * scale) / 2.0;
        // draw_text takes the baseline, so push down by the scaled height.
        let offset_y = (rect_height + size_y * scale) / 2.0;
        (optimal_size, offset_x, offset_y)
    }
}

/// How one container should be decorated this frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerMarks {
    pub selected: bool,
    pub highlighted: bool,
    pub solved: bool,
}

/// Everything the renderer needs for one frame.
pub struct Frame<'a> {
    pub containers: &'a [FluidContainer],
    pub selected: Option<usize>,
    pub highlighted: &'a [usize],
    pub solved: &'a BTreeSet<usize>,
    pub buttons: &'a [Button],
    pub title: &'a str,
    pub status: &'a str,
}

pub struct Renderer {
    cached_text_sizer: CachedTextSizer,
    hit_test: HitTestRegistry,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            cached_text_sizer: CachedTextSizer::new(),
            hit_test: HitTestRegistry::new(),
            x: 0.0,
            y: 0.0,
            width: 800.0,
            height: 600.0,
        }
    }

    pub fn get_hit_test_registry(&self) -> &HitTestRegistry {
        &self.hit_test
    }

    pub fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) -> bool {
        if self.x == x && self.y == y && self.width == width && self.height == height {
            return false;
        }
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        true
    }

    pub fn autoset_viewport(&mut self) -> bool {
        let (screen_w, screen_h) = (screen_width(), screen_height());
        self.set_viewport(0.0, 0.0, screen_w, screen_h)
    }

    pub fn render_game(&mut self, frame: &Frame) {
        // New frame: reset hit-test registry.
        self.hit_test.clear();

        clear_background(BLACK);
        let area_padding = 10.0;
        let button_area_height = self.height * 0.1;
        let text_area_height = self.height * 0.06;
        let container_area_height = self.height
            - button_area_height
            - 2.0 * text_area_height
            - 3.0 * area_padding;

        let mut y = self.y;
        self.render_text(
            frame.title,
            Rect::new(self.x, y, self.width, text_area_height),
            WHITE,
        );
        y += text_area_height + area_padding;
        self.render_container_grid(
            frame,
            6,
            Rect::new(self.x, y, self.width, container_area_height),
        );
        y += container_area_height + area_padding;
        self.render_text(
            frame.status,
            Rect::new(self.x, y, self.width, text_area_height),
            LIGHTGRAY,
        );
        y += text_area_height + area_padding;
        self.render_button_lineup(
            frame.buttons,
            Rect::new(self.x, y, self.width, button_area_height),
        );
    }

    pub fn render_text(&self, text: &str, rect: Rect, color: Color) {
        if text.is_empty() {
            return;
        }
        let (optimal_size, x, y) = self
            .cached_text_sizer
            .get_text_max_size(text, rect.w, rect.h);
        draw_text(text, rect.x + x, rect.y + y, optimal_size, color);
    }

    pub fn render_packet(&self, packet: Option<&FluidPacket>, rect: Rect) {
        match packet {
            None => {
                draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, DARKGRAY);
            }
            Some(packet) => {
                draw_rectangle(rect.x, rect.y, rect.w, rect.h, packet_color(packet));
                draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, BLACK);
            }
        }
    }

    pub fn render_container(
        &mut self,
        container: &FluidContainer,
        container_index: usize,
        marks: ContainerMarks,
        rect: Rect,
    ) {
        self.hit_test.push(
            rect,
            HitItem::Container {
                index: container_index,
            },
        );

        // A picked-up container floats a little above the others.
        let rect = if marks.selected {
            Rect::new(rect.x, rect.y - rect.h * 0.08, rect.w, rect.h)
        } else {
            rect
        };

        let capacity = container.get_capacity();
        let packets = container.get_packets();
        let packet_height = rect.h / capacity as f32;
        for i in 0..capacity {
            let packet_y = rect.y + rect.h - (i as f32 + 1.0) * packet_height;
            self.render_packet(
                packets.get(i),
                Rect::new(rect.x, packet_y, rect.w, packet_height),
            );
        }

        let (thickness, outline) = if marks.selected {
            (4.0, WHITE)
        } else if marks.highlighted {
            (4.0, GOLD)
        } else if marks.solved {
            (3.0, GREEN)
        } else {
            (3.0, GRAY)
        };
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, thickness, outline);
    }

    fn render_container_lineup(
        &mut self,
        frame: &Frame,
        range: std::ops::Range<usize>,
        columns: usize,
        rect: Rect,
    ) {
        let spacing = 20.0;
        let total_spacing = spacing * (columns as f32 - 1.0);
        let container_width = ((rect.w - total_spacing) / columns as f32).min(rect.h * 0.4);
        let row_width = container_width * range.len() as f32 + spacing * (range.len() as f32 - 1.0);
        let start_x = rect.x + (rect.w - row_width) / 2.0;
        for (i, container_index) in range.enumerate() {
            let container_x = start_x + i as f32 * (container_width + spacing);
            let marks = ContainerMarks {
                selected: frame.selected == Some(container_index),
                highlighted: frame.highlighted.contains(&container_index),
                solved: frame.solved.contains(&container_index),
            };
            self.render_container(
                &frame.containers[container_index],
                container_index,
                marks,
                Rect::new(container_x, rect.y, container_width, rect.h),
            );
        }
    }

    fn render_container_grid(&mut self, frame: &Frame, max_columns: usize, rect: Rect) {
        let container_count = frame.containers.len();
        if container_count == 0 {
            return;
        }
        let rows = container_count.div_ceil(max_columns);
        let columns = container_count.div_ceil(rows);
        let spacing = 30.0;
        let total_spacing_y = spacing * (rows as f32 - 1.0);
        let container_height = (rect.h - total_spacing_y) / rows as f32;

        for row in 0..rows {
            let start_idx = row * columns;
            let end_idx = (start_idx + columns).min(container_count);
            let container_y = rect.y + row as f32 * (container_height + spacing);
            self.render_container_lineup(
                frame,
                start_idx..end_idx,
                columns,
                Rect::new(rect.x, container_y, rect.w, container_height),
            );
        }
    }

    pub fn render_button(&mut self, button: &Button, index: usize, rect: Rect) {
        self.hit_test.push(rect, HitItem::Button { index });

        draw_rectangle(rect.x, rect.y, rect.w, rect.h, button.get_color());
        draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 2.0, BLACK);
        self.render_text(button.get_label(), rect, WHITE);
    }

    pub fn render_button_lineup(&mut self, buttons: &[Button], rect: Rect) {
        if buttons.is_empty() {
            return;
        }
        let button_count = buttons.len() as f32;
        let spacing = 10.0;
        let total_spacing = spacing * (button_count - 1.0);
        let button_width = (rect.w - total_spacing) / button_count;
        for (i, button) in buttons.iter().enumerate() {
            let button_x = rect.x + i as f32 * (button_width + spacing);
            self.render_button(
                button,
                i,
                Rect::new(button_x, rect.y, button_width, rect.h),
            );
        }
    }
}
