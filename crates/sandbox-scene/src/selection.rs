//! Host-owned selection over a fixed set of choices, plus the controls that
//! read and write it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use sandbox_engine::coords::Vec2;
use sandbox_engine::paint::Color;

use crate::builder::ButtonSpec;
use crate::graph::ButtonStyle;

const SELECTED_BORDER: u32 = 0xffd700;
const IDLE_BORDER: u32 = 0x888888;
const PLAY_READY: u32 = 0x28a745;
const PLAY_WAITING: u32 = 0x555555;

/// A closed set of selectable values.
pub trait Choice: Copy + Eq + fmt::Debug + 'static {
    /// Every value, in display order.
    const ALL: &'static [Self];

    fn label(self) -> &'static str;
}

/// The horses of the race scene, in sprite-slot order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Horse {
    White,
    Black,
    Brown,
    Gray,
}

impl Choice for Horse {
    const ALL: &'static [Self] = &[Horse::White, Horse::Black, Horse::Brown, Horse::Gray];

    fn label(self) -> &'static str {
        match self {
            Horse::White => "White",
            Horse::Black => "Black",
            Horse::Brown => "Brown",
            Horse::Gray => "Gray",
        }
    }
}

/// At most one selected value. Clones share the same state.
///
/// Owned by the host; the scene only reads and writes it from button
/// handlers and never persists it.
pub struct Selection<T> {
    value: Rc<Cell<Option<T>>>,
}

impl<T> Clone for Selection<T> {
    fn clone(&self) -> Self {
        Self { value: self.value.clone() }
    }
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self { value: Rc::new(Cell::new(None)) }
    }
}

impl<T: Choice> Selection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<T> {
        self.value.get()
    }

    pub fn set(&self, choice: T) {
        self.value.set(Some(choice));
    }

    pub fn clear(&self) {
        self.value.set(None);
    }

    pub fn is_selected(&self, choice: T) -> bool {
        self.get() == Some(choice)
    }
}

impl<T: Choice> fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selection").field(&self.get()).finish()
    }
}

/// One button per choice in a row starting at `origin`, `gap` apart. Each
/// writes its choice into `selection`; the selected one has a gold border.
pub fn selection_buttons<T: Choice>(selection: &Selection<T>, origin: Vec2, gap: f32) -> Vec<ButtonSpec> {
    let step = ButtonSpec::DEFAULT_SIZE.x + gap;
    T::ALL
        .iter()
        .enumerate()
        .map(|(i, &choice)| {
            let on_tap = selection.clone();
            let on_paint = selection.clone();
            ButtonSpec::new(choice.label(), Vec2::new(origin.x + i as f32 * step, origin.y), move || {
                on_tap.set(choice);
                log::info!("selected {}", choice.label());
            })
            .with_style(move || {
                let style = ButtonStyle::default();
                if on_paint.is_selected(choice) {
                    style.with_border(Color::from_rgb_hex(SELECTED_BORDER), 2.0)
                } else {
                    style.with_border(Color::from_rgb_hex(IDLE_BORDER), 1.0)
                }
            })
        })
        .collect()
}

/// A "Play" control that hands the current choice to `on_play`.
///
/// Greyed out and disabled while no choice is selected.
pub fn play_button<T: Choice>(
    selection: &Selection<T>,
    position: Vec2,
    on_play: impl Fn(T) + 'static,
) -> ButtonSpec {
    let on_tap = selection.clone();
    let on_paint = selection.clone();
    ButtonSpec::new("Play", position, move || match on_tap.get() {
        Some(choice) => on_play(choice),
        None => log::info!("play ignored: nothing selected"),
    })
    .with_style(move || match on_paint.get() {
        Some(_) => ButtonStyle::filled(Color::from_rgb_hex(PLAY_READY)),
        None => ButtonStyle::filled(Color::from_rgb_hex(PLAY_WAITING)).disabled(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn one_button_per_horse_in_order() {
        let selection = Selection::<Horse>::new();
        let buttons = selection_buttons(&selection, Vec2::new(10.0, 500.0), 10.0);

        let labels: Vec<&str> = buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["White", "Black", "Brown", "Gray"]);
        assert_eq!(buttons[1].position, Vec2::new(140.0, 500.0));
    }

    #[test]
    fn activating_a_button_replaces_the_selection() {
        let selection = Selection::<Horse>::new();
        let buttons = selection_buttons(&selection, Vec2::zero(), 0.0);

        (buttons[2].on_activate)();
        assert_eq!(selection.get(), Some(Horse::Brown));
        (buttons[0].on_activate)();
        assert!(selection.is_selected(Horse::White));
    }

    #[test]
    fn play_requires_a_selection() {
        let selection = Selection::<Horse>::new();
        let played = Rc::new(RefCell::new(Vec::new()));
        let sink = played.clone();
        let play = play_button(&selection, Vec2::zero(), move |h| sink.borrow_mut().push(h));

        (play.on_activate)();
        assert!(played.borrow().is_empty());

        selection.set(Horse::Gray);
        (play.on_activate)();
        assert_eq!(*played.borrow(), vec![Horse::Gray]);
    }

    #[test]
    fn selected_horse_gets_the_gold_border() {
        let selection = Selection::<Horse>::new();
        let buttons = selection_buttons(&selection, Vec2::zero(), 0.0);
        let border = |i: usize| (buttons[i].style)().border.map(|b| (b.color, b.width));

        let gold = Some((Color::from_rgb_hex(SELECTED_BORDER), 2.0));
        let idle = Some((Color::from_rgb_hex(IDLE_BORDER), 1.0));
        assert!((0..4).all(|i| border(i) == idle));

        (buttons[1].on_activate)();
        assert_eq!(border(1), gold);
        assert_eq!(border(0), idle);
    }

    #[test]
    fn play_is_greyed_until_something_is_selected() {
        let selection = Selection::<Horse>::new();
        let play = play_button(&selection, Vec2::zero(), |_| {});

        let waiting = (play.style)();
        assert!(!waiting.enabled);
        assert_eq!(waiting.fill, Color::from_rgb_hex(PLAY_WAITING));

        selection.set(Horse::White);
        let ready = (play.style)();
        assert!(ready.enabled);
        assert_eq!(ready.fill, Color::from_rgb_hex(PLAY_READY));
    }
}
