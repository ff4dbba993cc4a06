//! Desktop end-to-end: windows, focus, hit tests, drag, keyboard routing
//! into terminal sessions, and compositor determinism.

use std::sync::{Arc, Mutex};

use kernel::gfx::FrameBuffer;
use kernel::input::keyboard::Keyboard;
use kernel::input::mouse::Mouse;
use kernel::input::MouseButtons;
use kernel::terminal::TerminalMultiplexer;
use kernel::wm::compositor::render;
use kernel::wm::drag::DragRouter;
use kernel::wm::keyboard::KeyboardRouter;
use kernel::wm::{Window, WindowManager};

struct Desk {
    wm: WindowManager,
    fb: FrameBuffer,
    keyboard: Keyboard,
    mouse: Mouse,
    krouter: KeyboardRouter,
    drag: DragRouter,
    mux: Arc<Mutex<TerminalMultiplexer>>,
    left: usize,
    right: usize,
    left_ep: u32,
    right_ep: u32,
}

fn desk() -> Desk {
    let mut wm = WindowManager::new(0x0020_2830);
    let left = wm
        .add_window(Window::new("terminal-1", 40, 60, 260, 180))
        .unwrap();
    let right = wm
        .add_window(Window::new("terminal-2", 220, 140, 260, 180))
        .unwrap();

    let mux = Arc::new(Mutex::new(TerminalMultiplexer::new()));
    let (left_ep, right_ep) = {
        let mut mux = mux.lock().unwrap();
        (mux.create_session(left), mux.create_session(right))
    };

    let mut krouter = KeyboardRouter::new();
    krouter.register_window(left, left_ep);
    krouter.register_window(right, right_ep);
    let sink_mux = mux.clone();
    krouter.set_sink(Box::new(move |endpoint, event| {
        sink_mux.lock().unwrap().deliver(endpoint, event);
    }));

    let mut drag = DragRouter::new();
    drag.register_window(left, left_ep);
    drag.register_window(right, right_ep);

    Desk {
        wm,
        fb: FrameBuffer::new(640, 480),
        keyboard: Keyboard::new(),
        mouse: Mouse::new(),
        krouter,
        drag,
        mux,
        left,
        right,
        left_ep,
        right_ep,
    }
}

fn click(desk: &mut Desk, x: u32, y: u32) {
    desk.mouse.emit_button_down(x, y, MouseButtons::LEFT);
    desk.mouse.emit_button_up(x, y, MouseButtons::LEFT);
    desk.drag.dispatch_pending(&mut desk.mouse, &mut desk.wm);
}

fn type_scancodes(desk: &mut Desk, scancodes: &[u8]) {
    for &sc in scancodes {
        desk.keyboard.handle_scancode(sc);
    }
    desk.krouter.dispatch_pending(&mut desk.keyboard, &desk.wm);
}

const HELLO_ENTER: &[u8] = &[0x23, 0x12, 0x26, 0x26, 0x18, 0x1c];
const HI_ENTER: &[u8] = &[0x23, 0x17, 0x1c];

#[test]
fn boot_scene_renders_identically_twice() {
    let mut desk = desk();
    let first = render(&desk.wm, &mut desk.fb);
    let second = render(&desk.wm, &mut desk.fb);
    assert_eq!(first, second);
}

#[test]
fn two_terminals_receive_their_own_keystrokes() {
    let mut desk = desk();

    // Focus the left window (title bar click) and type hello<Enter>.
    click(&mut desk, 50, 65);
    assert_eq!(desk.wm.active_window(), Some(desk.left));
    type_scancodes(&mut desk, HELLO_ENTER);

    // Focus the right window (left now overlaps it, so click a point only
    // the right window covers) and type hi<Enter>.
    click(&mut desk, 350, 150);
    assert_eq!(desk.wm.active_window(), Some(desk.right));
    type_scancodes(&mut desk, HI_ENTER);

    let mux = desk.mux.lock().unwrap();
    let left = mux.session(desk.left_ep).unwrap();
    let right = mux.session(desk.right_ep).unwrap();

    assert_eq!(left.history().last(), Some("hello"));
    assert_eq!(left.lines_executed(), 1);
    assert_eq!(right.history().last(), Some("hi"));
    assert_eq!(right.lines_executed(), 1);
    assert_ne!(left.marker(), right.marker());
}

#[test]
fn activating_back_window_flips_hit_test_and_fingerprint() {
    let mut desk = desk();
    let before = render(&desk.wm, &mut desk.fb);

    // (230, 150) lies inside both frames; the right window is on top.
    assert_eq!(desk.wm.hit_test(230, 150).unwrap().0, desk.right);
    assert!(desk.wm.activate(desk.left));
    assert_eq!(desk.wm.hit_test(230, 150).unwrap().0, desk.left);
    assert_eq!(desk.wm.active_window(), Some(desk.left));

    let after = render(&desk.wm, &mut desk.fb);
    assert_ne!(before, after);
}

#[test]
fn dragging_by_title_bar_moves_the_scene() {
    let mut desk = desk();
    let before = render(&desk.wm, &mut desk.fb);

    desk.mouse.emit_button_down(230, 145, MouseButtons::LEFT);
    desk.mouse.emit_move(300, 240, MouseButtons::LEFT);
    desk.mouse.emit_button_up(300, 240, MouseButtons::LEFT);
    desk.drag.dispatch_pending(&mut desk.mouse, &mut desk.wm);

    let frame = desk.wm.window(desk.right).frame;
    assert_eq!((frame.x, frame.y), (290, 235));

    let after = render(&desk.wm, &mut desk.fb);
    assert_ne!(before, after);
}

#[test]
fn keystrokes_without_focus_are_dropped() {
    let mut desk = desk();
    // Click empty desktop space: focus stays, but drop focus by building a
    // fresh manager with no windows to prove the router's behavior.
    let empty = WindowManager::new(0);
    desk.keyboard.handle_scancode(0x1e);
    assert_eq!(
        desk.krouter.dispatch_pending(&mut desk.keyboard, &empty),
        0
    );
    let mux = desk.mux.lock().unwrap();
    assert_eq!(mux.session(desk.left_ep).unwrap().input(), "");
}
