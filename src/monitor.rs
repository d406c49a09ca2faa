use crate::types::{PlayState, Snapshot, MEASURES_PER_LOOP};
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Renders a live ASCII dashboard of the loop state.
pub struct ConsoleMonitor {
    rx: Receiver<Snapshot>,
    refresh_interval_ms: u64,
    update_hz: u32,
}

impl ConsoleMonitor {
    pub fn new(rx: Receiver<Snapshot>, refresh_interval_ms: u64, update_hz: u32) -> Self {
        Self {
            rx,
            refresh_interval_ms,
            update_hz,
        }
    }

    // The publisher refreshes faster than a terminal can redraw; skip
    // snapshots to hit roughly update_hz redraws per second at whatever
    // rate the session actually publishes.
    fn redraw_skip(&self) -> u64 {
        let publish_hz = (1000 / self.refresh_interval_ms.max(1)).max(1);
        if self.update_hz == 0 {
            publish_hz
        } else {
            (publish_hz / self.update_hz as u64).max(1)
        }
    }

    pub fn run(&self) {
        let skip = self.redraw_skip();
        let mut count: u64 = 0;
        let mut stdout = io::stdout();

        for snap in self.rx.iter() {
            count += 1;
            if count % skip != 0 {
                continue;
            }

            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");

            println!("╔══════════════════════════════════════════════════════════╗");
            println!("║  LOOPWATCH — Live Loop Monitor                           ║");
            println!("╠══════════════════════════════════════════════════════════╣");

            println!(
                "║  Clock: {:>12.2}s   Loop #{:<8} ({:>4.0}% through)    ║",
                snap.now_seconds,
                snap.loop_iteration,
                snap.loop_progress * 100.0
            );
            println!(
                "║  Beat: {:>5.2}/64   Measure {:>2}  (beat {:.2} in measure)     ║",
                snap.current_beat, snap.current_measure, snap.beat_in_measure
            );

            // Measure strip: ▼ marks the playhead, ░ marks muted measures
            println!("║                                                          ║");
            println!("║  Measures:  {}                  ║", measure_strip(&snap));

            let progress = make_bar(snap.loop_progress as f32, 40);
            println!("║  {}              ║", progress);

            println!("║                                                          ║");
            println!(
                "║  Playing: {:>3}   Upcoming: {:>3}   Recent: {:>3}             ║",
                snap.playing_count, snap.upcoming_count, snap.recent_count
            );

            println!("║                                                          ║");
            println!("║  Notes:                                                  ║");
            let mut lines = 0;
            for inst in &snap.instances {
                if lines >= 12 {
                    println!(
                        "║    … and {} more                                       ║",
                        snap.instances.len() - lines
                    );
                    break;
                }
                let marker = match inst.state {
                    PlayState::Playing => "▶",
                    PlayState::Upcoming => "·",
                    PlayState::Recent => "✓",
                };
                println!(
                    "║    {} {:<12} {:>8.1}Hz  {:>8.2}s → {:<8.2}s      ║",
                    marker, inst.id, inst.note.pitch, inst.start_seconds, inst.end_seconds
                );
                lines += 1;
            }
            if snap.instances.is_empty() {
                println!("║    (silence)                                             ║");
            }

            println!("╚══════════════════════════════════════════════════════════╝");
            let _ = stdout.flush();
        }
    }
}

fn measure_strip(snap: &Snapshot) -> String {
    let mut strip = String::new();
    for m in 0..MEASURES_PER_LOOP {
        if m == snap.current_measure {
            strip.push('▼');
        } else if snap.is_measure_active(m) {
            strip.push('█');
        } else {
            strip.push('░');
        }
        strip.push(' ');
    }
    strip
}

fn make_bar(val: f32, width: usize) -> String {
    let filled = (val * width as f32).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}
