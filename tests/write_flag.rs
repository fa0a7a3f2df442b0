use evac_hashmap::WriteFlag;
use std::process::Command;

const ABORT_CHILD_ENV: &str = "EVAC_HASHMAP_ABORT_CHILD";

#[test]
fn flag_is_shared_across_threads() {
    let f = WriteFlag::new();
    let g = f.enter();
    std::thread::scope(|s| {
        s.spawn(|| {
            assert!(f.is_writing());
            assert!(f.try_enter().is_err());
        });
    });
    drop(g);
    std::thread::scope(|s| {
        s.spawn(|| {
            let _g = f.try_enter().expect("no writer left");
        });
    });
}

/// A second writer must take the whole process down, not panic. Re-runs this
/// test in a child process that trips the flag, then inspects how it died.
#[test]
fn second_writer_aborts_the_process() {
    if std::env::var_os(ABORT_CHILD_ENV).is_some() {
        let f = WriteFlag::new();
        let _first = f.enter();
        let _second = f.enter();
        unreachable!("second enter returned");
    }

    let exe = std::env::current_exe().expect("test binary path");
    let out = Command::new(exe)
        .args(["--exact", "second_writer_aborts_the_process", "--nocapture", "--test-threads=1"])
        .env(ABORT_CHILD_ENV, "1")
        .output()
        .expect("spawn child test process");

    assert!(!out.status.success(), "child survived a double enter");
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(out.status.signal(), Some(6), "expected SIGABRT, got {:?}", out.status);
    }
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("fatal error: concurrent map writes"),
        "stderr was: {stderr}"
    );
}
