use super::*;

#[test]
fn test_finish_without_start_returns_zero() {
    let mut timer = FrameTimer::new(4);
    assert_eq!(timer.frame_finish(), Duration::ZERO);
    assert_eq!(timer.total_frames(), 0);
}

#[test]
fn test_window_fills_and_resets() {
    let mut timer = FrameTimer::new(2);
    assert!(!timer.is_window_full());

    timer.frame_start();
    timer.frame_finish();
    assert!(!timer.is_window_full());

    timer.frame_start();
    timer.frame_finish();
    assert!(timer.is_window_full());

    timer.reset_window();
    assert!(!timer.is_window_full());
    // Running totals survive the window reset
    assert_eq!(timer.total_frames(), 2);
}

#[test]
fn test_zero_window_keeps_totals_only() {
    let mut timer = FrameTimer::new(0);
    for _ in 0..3 {
        timer.frame_start();
        timer.frame_finish();
    }
    assert!(!timer.is_window_full());
    assert_eq!(timer.total_frames(), 3);
    assert!(timer.report_string().contains("3 frames"));
}

#[test]
fn test_report_with_no_frames() {
    let timer = FrameTimer::new(8);
    assert_eq!(timer.report_string(), "no frames recorded");
}

#[test]
fn test_frame_duration_measures_elapsed_time() {
    let mut timer = FrameTimer::new(0);
    timer.frame_start();
    std::thread::sleep(Duration::from_millis(5));
    let elapsed = timer.frame_finish();
    assert!(elapsed >= Duration::from_millis(5));
    assert!(timer.average() >= Duration::from_millis(5));
}
