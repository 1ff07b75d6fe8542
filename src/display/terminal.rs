use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::viewport::Viewport;
use crate::color;
use crate::config::Config;
use crate::fixture::{Address, Endpoint, LogicalAddress, StrandId};
use crate::geometry::{BoundingBox, Point};
use crate::net::{self, DecoderStats};
use crate::scene::{Scene, SpatialConfig};

const PIXEL_GLYPH: char = '●';
const UNLIT_GLYPH: char = '·';
const INTERSECTION_GLYPH: char = '✕';
const COLLISION_GLYPH: char = '○';

const KEY_HELP: &str = " [a]dd [d]elete [C]lear arrows move [+/-] pixels [>] next strand [s]ave [w]armup [i]ntersections [q]uit";

/// Written to the working directory when a scene without a file is saved.
const UNTITLED_SCENE_FILE: &str = "untitled-scene.json";

/// Scene edits bound to keys.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Edit {
    AddFixture,
    RemoveSelected,
    ClearFixtures,
    /// Shift the selected fixture by a scene-space offset
    Nudge(Point),
    /// Grow or shrink the selected fixture by this many pixels
    Resize(i32),
    /// Re-address the selected fixture to the end of the next strand
    NextStrand,
    Save,
}

impl Edit {
    /// `step` is how far one arrow press moves a fixture, in scene units.
    fn from_key(key: KeyEvent, step: f64) -> Option<Self> {
        let edit = match key.code {
            KeyCode::Char('a') => Edit::AddFixture,
            KeyCode::Char('d') | KeyCode::Delete => Edit::RemoveSelected,
            KeyCode::Char('C') => Edit::ClearFixtures,
            KeyCode::Char('s') => Edit::Save,
            KeyCode::Char('+') | KeyCode::Char('=') => Edit::Resize(1),
            KeyCode::Char('-') => Edit::Resize(-1),
            KeyCode::Char('>') => Edit::NextStrand,
            KeyCode::Left => Edit::Nudge(Point::new(-step, 0.0)),
            KeyCode::Right => Edit::Nudge(Point::new(step, 0.0)),
            KeyCode::Up => Edit::Nudge(Point::new(0.0, -step)),
            KeyCode::Down => Edit::Nudge(Point::new(0.0, step)),
            _ => return None,
        };
        Some(edit)
    }
}

/// Selection and toggles driven by user input.
#[derive(Debug, Default)]
struct PreviewState {
    selected: Option<(StrandId, Address)>,
    colliding: Vec<LogicalAddress>,
    show_intersections: bool,
    message: Option<String>,
}

impl PreviewState {
    fn select(&mut self, scene: &mut Scene, target: Option<(StrandId, Address)>, radius: f64) {
        self.selected = target;
        self.colliding.clear();
        let Some((strand, address)) = target else {
            return;
        };
        for endpoint in [Endpoint::Start, Endpoint::End] {
            if let Ok(hits) = scene.colliding_fixtures(strand, address, endpoint, radius) {
                self.colliding.extend(
                    hits.into_iter()
                        .filter(|l| (l.strand, l.address) != (strand, address)),
                );
            }
        }
        self.colliding.sort();
        self.colliding.dedup();
        self.message = scene.fixture(strand, address).map(|f| {
            format!(
                "{} | {} collisions: {}",
                f,
                self.colliding.len(),
                self.colliding
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            )
        });
    }

    fn selection(&self) -> Result<(StrandId, Address)> {
        self.selected.context("No fixture selected")
    }

    /// Applies `edit`, then selects the fixture it produced (if any) and
    /// reports the outcome on the message line.
    fn apply(&mut self, scene: &mut Scene, edit: Edit, radius: f64) {
        match self.edit_scene(scene, edit) {
            Ok((target, message)) => {
                self.select(scene, target, radius);
                self.message = Some(message);
            }
            Err(e) => {
                warn!("{:?} failed: {:#}", edit, e);
                self.message = Some(format!("{:#}", e));
            }
        }
    }

    fn edit_scene(&self, scene: &mut Scene, edit: Edit) -> Result<(Option<(StrandId, Address)>, String)> {
        match edit {
            Edit::AddFixture => {
                let (strand, address) = scene.add_default_fixture()?;
                Ok((Some((strand, address)), format!("Added fixture {}:{}", strand, address)))
            }
            Edit::RemoveSelected => {
                let (strand, address) = self.selection()?;
                let removed = scene.remove_fixture(strand, address)?;
                Ok((None, format!("Removed {}", removed)))
            }
            Edit::ClearFixtures => {
                let count = scene.fixture_count();
                scene.clear_fixtures();
                Ok((None, format!("Cleared {} fixtures", count)))
            }
            Edit::Nudge(delta) => {
                let (strand, address) = self.selection()?;
                let geometry = scene
                    .fixture(strand, address)
                    .map(|f| f.geometry().translated(delta))
                    .context("Selected fixture no longer exists")?;
                scene.move_fixture(strand, address, geometry)?;
                Ok((Some((strand, address)), format!("Moved {}:{}", strand, address)))
            }
            Edit::Resize(delta) => {
                let (strand, address) = self.selection()?;
                let pixels = scene
                    .fixture(strand, address)
                    .map(|f| f.pixels().saturating_add_signed(delta).max(1))
                    .context("Selected fixture no longer exists")?;
                scene.set_pixel_count(strand, address, pixels)?;
                Ok((
                    Some((strand, address)),
                    format!("{}:{} has {} pixels", strand, address, pixels),
                ))
            }
            Edit::NextStrand => {
                let (strand, address) = self.selection()?;
                let to_strand = strand.wrapping_add(1);
                let to_address = scene
                    .fixture_hierarchy()
                    .get(&to_strand)
                    .and_then(|fixtures| fixtures.keys().next_back())
                    .map_or(0, |a| a.saturating_add(1));
                scene.readdress_fixture((strand, address), (to_strand, to_address))?;
                Ok((
                    Some((to_strand, to_address)),
                    format!("Readdressed {}:{} to {}:{}", strand, address, to_strand, to_address),
                ))
            }
            Edit::Save => {
                let path = save_scene(scene)?;
                Ok((self.selected, format!("Saved {}", path.display())))
            }
        }
    }
}

/// Saves to the scene's own file, or to an untitled file in the working
/// directory for a scene that was never loaded or saved.
fn save_scene(scene: &mut Scene) -> Result<PathBuf> {
    match scene.path().map(Path::to_path_buf) {
        Some(path) => {
            scene.save()?;
            Ok(path)
        }
        None => {
            let path = PathBuf::from(UNTITLED_SCENE_FILE);
            scene.save_as(&path)?;
            Ok(path)
        }
    }
}

/// The pixel closest to `point`: its flat index, logical address, position
/// in its strand buffer and how crowded its surroundings are.
fn describe_nearest(scene: &mut Scene, point: Point, neighbor_radius: f64) -> Option<String> {
    let (index, d) = scene.nearest_pixel(point)?;
    let logical = scene.index_to_logical(index)?;
    let (strand, offset) = scene.buffer_address(logical)?;
    let start = scene.logical_to_index(LogicalAddress::new(logical.strand, logical.address, 0))?;
    let from_start = scene.pixel_distance(start, index)?;
    let neighbors = scene.pixel_neighbors(index, neighbor_radius).len().saturating_sub(1);
    let mut message = format!(
        "Nearest pixel {} (#{}, strand {} offset {}) {:.1} away, {:.1} from fixture start, {} neighbors",
        logical, index, strand, offset, d, from_start, neighbors
    );
    if let Some(row) = scene.pixel_distances(index) {
        let farthest = row.iter().copied().fold(0.0, f64::max);
        message.push_str(&format!(", farthest pixel {:.1} away", farthest));
    }
    Some(message)
}

pub async fn run(config: Config, scene: Scene) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, config, scene).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
    mut scene: Scene,
) -> Result<()> {
    let (_receiver, stream) = net::start_receiver(config.net.bind_addr()).await?;
    let spatial = SpatialConfig::from(&config.spatial);

    let mut state = PreviewState {
        show_intersections: config.preview.show_intersections,
        ..PreviewState::default()
    };
    let target_fps = Duration::from_secs_f64(1.0 / config.preview.fps.max(1) as f64);

    loop {
        let frame_data = stream.frames.borrow().clone();
        let stats = *stream.stats.borrow();

        let size = terminal.size()?;
        let scene_area = Rect::new(0, 1, size.width, size.height.saturating_sub(2));
        let bounds = scene_bounds(&mut scene);
        let viewport = Viewport::fit(bounds, scene_area);

        let colors = scene.pixel_colors(&frame_data);
        let selected_range = state.selected.and_then(|(strand, address)| {
            let first = scene.logical_to_index(LogicalAddress::new(strand, address, 0))?;
            let pixels = scene.fixture(strand, address)?.pixels() as usize;
            Some(first..first + pixels)
        });
        let collisions: Vec<Point> = state
            .colliding
            .iter()
            .filter_map(|&l| {
                let index = scene.logical_to_index(l)?;
                scene.pixel_location(index)
            })
            .collect();
        let intersections = if state.show_intersections {
            scene.intersection_points(spatial.intersection_threshold)
        } else {
            Vec::new()
        };
        let name = scene.name().to_string();
        let dirty = scene.is_dirty();
        let warm = scene.spatial_cache().is_warm();
        let locations = scene.all_pixel_locations();

        terminal.draw(|frame| {
            let area = frame.area();
            let block = ratatui::widgets::Block::default().style(Style::default().bg(Color::Reset));
            frame.render_widget(block, area);

            let buf = frame.buffer_mut();
            for (index, (&location, &rgb)) in locations.iter().zip(colors.iter()).enumerate() {
                let Some(pos) = viewport.to_cell(location) else {
                    continue;
                };
                let selected = selected_range.as_ref().is_some_and(|r| r.contains(&index));
                if let Some(cell) = buf.cell_mut(pos) {
                    if color::is_dark(rgb) {
                        cell.set_char(UNLIT_GLYPH);
                        cell.set_fg(if selected { Color::White } else { Color::DarkGray });
                    } else {
                        let rgb = if selected { color::highlight(rgb) } else { rgb };
                        cell.set_char(PIXEL_GLYPH);
                        cell.set_fg(color::to_terminal(rgb));
                    }
                }
            }

            for &point in &collisions {
                let Some(pos) = viewport.to_cell(point) else {
                    continue;
                };
                if let Some(cell) = buf.cell_mut(pos) {
                    cell.set_char(COLLISION_GLYPH);
                    cell.set_fg(Color::Yellow);
                }
            }

            for &point in &intersections {
                let Some(pos) = viewport.to_cell(point) else {
                    continue;
                };
                if let Some(cell) = buf.cell_mut(pos) {
                    cell.set_char(INTERSECTION_GLYPH);
                    cell.set_fg(Color::Red);
                }
            }

            render_status(frame, area, &name, dirty, warm, &stats, frame_data.sequence);
            let bottom = area.bottom().saturating_sub(1);
            match state.message {
                Some(ref message) => render_line(frame, area, bottom, message, Color::Gray),
                None => render_line(frame, area, bottom, KEY_HELP, Color::DarkGray),
            }
        })?;

        // Handle input
        if event::poll(target_fps)? {
            match event::read()? {
                Event::Key(key) => match key {
                    KeyEvent {
                        code: KeyCode::Char('q'),
                        ..
                    }
                    | KeyEvent {
                        code: KeyCode::Char('c'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => {
                        break;
                    }
                    KeyEvent {
                        code: KeyCode::Char('w'),
                        ..
                    } => {
                        scene.warmup(&spatial);
                        state.message = Some(format!("Warmed up caches for {} pixels", scene.pixel_count()));
                    }
                    KeyEvent {
                        code: KeyCode::Char('i'),
                        ..
                    } => {
                        state.show_intersections = !state.show_intersections;
                    }
                    KeyEvent {
                        code: KeyCode::Esc, ..
                    } => {
                        state.select(&mut scene, None, spatial.collision_radius);
                        state.message = None;
                    }
                    key => {
                        if let Some(edit) = Edit::from_key(key, viewport.scale()) {
                            state.apply(&mut scene, edit, spatial.collision_radius);
                        }
                    }
                },
                Event::Mouse(MouseEvent {
                    kind: MouseEventKind::Down(MouseButton::Left),
                    column,
                    row,
                    ..
                }) => {
                    let point = viewport.to_scene(column, row);
                    // At least one cell of tolerance when zoomed far out.
                    let epsilon = config.spatial.hit_epsilon.max(viewport.scale());
                    let hits = scene.hit_test(point, epsilon);
                    debug!("Click at ({:.1}, {:.1}): {} hits", point.x, point.y, hits.len());
                    let target = hits.first().map(|h| (h.strand, h.address));
                    state.select(&mut scene, target, spatial.collision_radius);
                    if target.is_none() {
                        state.message = describe_nearest(&mut scene, point, spatial.neighbor_radius);
                    }
                }
                _ => {}
            }
        }
    }

    info!("Preview closed after {} frames", stream.frames.borrow().sequence);
    Ok(())
}

/// Bounds to fit on screen: the pixels, or the declared extents of an empty scene.
fn scene_bounds(scene: &mut Scene) -> BoundingBox {
    scene.fixture_bounding_box().unwrap_or_else(|| {
        let [w, h] = scene.extents();
        BoundingBox {
            xmin: 0.0,
            ymin: 0.0,
            xmax: w.max(1.0),
            ymax: h.max(1.0),
        }
    })
}

fn render_status(
    frame: &mut Frame,
    area: Rect,
    name: &str,
    dirty: bool,
    warm: bool,
    stats: &DecoderStats,
    sequence: u64,
) {
    let status = format!(
        " {}{} | {:.0} pps | {:.1} fps | frame {} | {} ",
        if name.is_empty() { "untitled" } else { name },
        if dirty { "*" } else { "" },
        stats.packets_per_sec,
        stats.frames_per_sec,
        sequence,
        if warm { "cached" } else { "lazy" }
    );
    render_line(frame, area, area.y, &status, Color::DarkGray);
}

fn render_line(frame: &mut Frame, area: Rect, y: u16, text: &str, fg: Color) {
    for (i, ch) in text.chars().enumerate() {
        if i < area.width as usize {
            let cell = frame.buffer_mut().cell_mut((area.x + i as u16, y));
            if let Some(cell) = cell {
                cell.set_char(ch);
                cell.set_fg(fg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;

    const RADIUS: f64 = 50.0;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn one_fixture() -> Scene {
        let mut scene = Scene::new("edit");
        scene
            .add_fixture(Fixture::linear(0, 0, 10, Point::new(0.0, 0.0), Point::new(90.0, 0.0)))
            .unwrap();
        scene
    }

    #[test]
    fn keys_map_to_edits() {
        assert_eq!(Edit::from_key(key(KeyCode::Char('a')), 1.0), Some(Edit::AddFixture));
        assert_eq!(Edit::from_key(key(KeyCode::Delete), 1.0), Some(Edit::RemoveSelected));
        assert_eq!(Edit::from_key(key(KeyCode::Char('C')), 1.0), Some(Edit::ClearFixtures));
        assert_eq!(Edit::from_key(key(KeyCode::Char('s')), 1.0), Some(Edit::Save));
        assert_eq!(
            Edit::from_key(key(KeyCode::Left), 2.5),
            Some(Edit::Nudge(Point::new(-2.5, 0.0)))
        );
        assert_eq!(Edit::from_key(key(KeyCode::Char('x')), 1.0), None);
    }

    #[test]
    fn add_selects_and_delete_removes() {
        let mut scene = Scene::new("empty");
        let mut state = PreviewState::default();

        state.apply(&mut scene, Edit::AddFixture, RADIUS);
        assert_eq!(state.selected, Some((0, 0)));
        assert_eq!(scene.fixture_count(), 1);
        assert_eq!(state.message.as_deref(), Some("Added fixture 0:0"));

        state.apply(&mut scene, Edit::RemoveSelected, RADIUS);
        assert_eq!(state.selected, None);
        assert_eq!(scene.fixture_count(), 0);
    }

    #[test]
    fn selection_edits_without_selection_change_nothing() {
        let mut scene = one_fixture();
        let mut state = PreviewState::default();
        for edit in [Edit::RemoveSelected, Edit::Nudge(Point::new(1.0, 0.0)), Edit::Resize(1), Edit::NextStrand] {
            state.apply(&mut scene, edit, RADIUS);
            assert_eq!(state.message.as_deref(), Some("No fixture selected"));
        }
        assert_eq!(scene.fixture(0, 0).unwrap().pixels(), 10);
        assert_eq!(scene.fixture(0, 0).unwrap().pos1(), Point::new(0.0, 0.0));
    }

    #[test]
    fn move_resize_and_readdress_follow_selection() {
        let mut scene = one_fixture();
        let mut state = PreviewState::default();
        state.select(&mut scene, Some((0, 0)), RADIUS);

        state.apply(&mut scene, Edit::Nudge(Point::new(10.0, -5.0)), RADIUS);
        assert_eq!(scene.fixture(0, 0).unwrap().pos1(), Point::new(10.0, -5.0));
        assert_eq!(scene.pixel_location(0), Some(Point::new(10.0, -5.0)));

        state.apply(&mut scene, Edit::Resize(-100), RADIUS);
        assert_eq!(scene.fixture(0, 0).unwrap().pixels(), 1);
        state.apply(&mut scene, Edit::Resize(1), RADIUS);
        assert_eq!(scene.pixel_count(), 2);

        state.apply(&mut scene, Edit::NextStrand, RADIUS);
        assert_eq!(state.selected, Some((1, 0)));
        assert!(scene.fixture(0, 0).is_none());
        assert_eq!(scene.fixture(1, 0).unwrap().pos1(), Point::new(10.0, -5.0));
    }

    #[test]
    fn clear_drops_fixtures_and_selection() {
        let mut scene = one_fixture();
        let mut state = PreviewState::default();
        state.select(&mut scene, Some((0, 0)), RADIUS);
        state.apply(&mut scene, Edit::ClearFixtures, RADIUS);
        assert_eq!(scene.fixture_count(), 0);
        assert_eq!(state.selected, None);
        assert_eq!(state.message.as_deref(), Some("Cleared 1 fixtures"));
    }

    #[test]
    fn save_writes_back_to_scene_file() {
        let path = std::env::temp_dir().join(format!("firesim-preview-save-{}.json", std::process::id()));
        let mut scene = one_fixture();
        scene.save_as(&path).unwrap();
        let mut state = PreviewState::default();

        state.apply(&mut scene, Edit::AddFixture, RADIUS);
        assert!(scene.is_dirty());
        state.apply(&mut scene, Edit::Save, RADIUS);
        let loaded = Scene::load(&path);
        let _ = std::fs::remove_file(&path);

        assert!(!scene.is_dirty());
        assert_eq!(state.message, Some(format!("Saved {}", path.display())));
        assert_eq!(loaded.unwrap().fixture_count(), 2);
    }

    #[test]
    fn nearest_pixel_reports_buffer_position() {
        let mut scene = one_fixture();
        scene
            .add_fixture(Fixture::linear(0, 1, 4, Point::new(0.0, 50.0), Point::new(30.0, 50.0)))
            .unwrap();

        let message = describe_nearest(&mut scene, Point::new(11.0, 48.0), 10.0).unwrap();
        assert_eq!(
            message,
            "Nearest pixel 0:1:1 (#11, strand 0 offset 11) 2.2 away, 10.0 from fixture start, 2 neighbors"
        );

        scene.warmup(&SpatialConfig::default());
        let message = describe_nearest(&mut scene, Point::new(11.0, 48.0), 10.0).unwrap();
        assert!(message.ends_with(", farthest pixel 94.3 away"));

        assert!(describe_nearest(&mut Scene::new("empty"), Point::new(0.0, 0.0), 10.0).is_none());
    }
}
