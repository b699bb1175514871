//! Demonstration of keyboard and mouse dispatch.
//!
//! This example shows how to:
//! 1. Check for hook permission
//! 2. Register callbacks on both dispatchers
//! 3. Start, restart and stop the listeners
//! 4. Remove a callback while listening
//!
//! Run with: cargo run --example listen_demo
//!
//! Note: Requires Input Monitoring permission on macOS.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use input_listeners::{
    callback, check_permission, KeyboardDispatcher, KeyboardEvent, MouseDispatcher, MouseEvent,
};

fn main() {
    println!("Input Listeners - Listen Demo");
    println!("=============================");
    println!();

    print!("Checking input hook permission... ");
    if check_permission() {
        println!("OK ✓");
    } else {
        println!("FAILED ✗");
        println!();
        println!("Please grant Input Monitoring permission and restart this demo.");
        return;
    }
    println!();

    let mut keyboard = KeyboardDispatcher::new();
    let mut mouse = MouseDispatcher::new();

    let key_printer = callback(|event: &KeyboardEvent| match &event.key {
        Some(key) => println!("  pressed key: {key}"),
        None => println!("  pressed an unidentified key"),
    });
    keyboard.add_callback(key_printer.clone());

    mouse.add_callback(callback(|event: &MouseEvent| {
        println!("  mouse click at ({};{})", event.x, event.y);
    }));

    if let Err(e) = keyboard.start() {
        eprintln!("Error starting keyboard listener: {e}");
        return;
    }
    if let Err(e) = mouse.start() {
        eprintln!("Error starting mouse listener: {e}");
        return;
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    println!("Listening for 10 seconds. Type and click!");
    wait(&running, Duration::from_secs(10));

    println!();
    println!("Restarting the keyboard listener...");
    keyboard.stop();
    if let Err(e) = keyboard.start() {
        eprintln!("Error restarting keyboard listener: {e}");
        return;
    }

    println!("Listening for 10 more seconds, keyboard output will stop after 5.");
    wait(&running, Duration::from_secs(5));
    keyboard.remove_callback(&key_printer);
    wait(&running, Duration::from_secs(5));

    keyboard.stop();
    mouse.stop();

    println!();
    println!("{}", keyboard.stats().summary("Keyboard"));
    println!("{}", mouse.stats().summary("Mouse"));
    println!();
    println!("Demo complete!");
}

fn wait(running: &AtomicBool, duration: Duration) {
    let start = Instant::now();
    while running.load(Ordering::SeqCst) && start.elapsed() < duration {
        std::thread::sleep(Duration::from_millis(100));
    }
}
