/*
 *  input/evdev.rs
 *
 *  p4mgr - LED destination sign manager
 *  (c) 2020-26 Stuart Hunter
 *
 *  Linux evdev keypad reader
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tokio::io::unix::AsyncFd;

use crate::input::Key;

/// `struct input_event` is a timeval followed by type, code, value. The
/// timeval width depends on the target, so the tail is read from the end.
const INPUT_EVENT_SIZE: usize = std::mem::size_of::<libc::input_event>();

const EV_KEY: u16 = 0x01;
const KEY_PRESSED: i32 = 1;

/// _IOW('E', 0x90, int)
const EVIOCGRAB: u64 = 0x4004_4590;

/// Device name fragments tried in order when no device is configured
const DEVICE_KEYWORDS: [&str; 5] = ["numpad", "keypad", "numeric", "number", "keyboard"];

/// Map a Linux key code to a sign key
pub fn key_from_code(code: u16) -> Option<Key> {
    let key = match code {
        // keypad digits
        82 => Key::Digit(0),
        79 => Key::Digit(1),
        80 => Key::Digit(2),
        81 => Key::Digit(3),
        75 => Key::Digit(4),
        76 => Key::Digit(5),
        77 => Key::Digit(6),
        71 => Key::Digit(7),
        72 => Key::Digit(8),
        73 => Key::Digit(9),
        // top row 1..9, 0
        2..=10 => Key::Digit((code - 1) as u8),
        11 => Key::Digit(0),
        // KEY_KPENTER, KEY_ENTER
        96 | 28 => Key::Enter,
        // KEY_BACKSPACE, KEY_KPDOT
        14 | 83 => Key::Clear,
        _ => return None,
    };
    Some(key)
}

/// Decode one raw `input_event`; only key-down events of known keys yield a key.
pub fn decode_event(buf: &[u8]) -> Option<Key> {
    let n = buf.len();
    if n < 8 {
        return None;
    }
    let ev_type = u16::from_ne_bytes([buf[n - 8], buf[n - 7]]);
    let code = u16::from_ne_bytes([buf[n - 6], buf[n - 5]]);
    let value = i32::from_ne_bytes([buf[n - 4], buf[n - 3], buf[n - 2], buf[n - 1]]);
    if ev_type != EV_KEY || value != KEY_PRESSED {
        return None;
    }
    key_from_code(code)
}

/// A keypad read straight from `/dev/input/eventN`
///
/// The fd is non-blocking and polled by the reactor, so dropping a
/// pending `next_key` leaves nothing running on the blocking pool.
#[derive(Debug)]
pub struct EvdevKeypad {
    fd: AsyncFd<File>,
    path: PathBuf,
    pending: Vec<u8>,
}

impl EvdevKeypad {
    /// Open `path`; with `grab` the device stops feeding the console.
    pub async fn open(path: impl AsRef<Path>, grab: bool) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)?;
        if grab {
            // SAFETY: fd is open for the lifetime of `file`; EVIOCGRAB takes an int by value.
            let rc = unsafe { libc::ioctl(file.as_raw_fd(), EVIOCGRAB as _, 1 as libc::c_int) };
            if rc < 0 {
                warn!("could not grab {}: {}", path.display(), io::Error::last_os_error());
            } else {
                debug!("grabbed {}", path.display());
            }
        }
        let fd = AsyncFd::new(file)?;
        info!("reading keypad from {}", path.display());
        Ok(Self {
            fd,
            path,
            pending: Vec::with_capacity(INPUT_EVENT_SIZE * 8),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next recognised key press, None once the device goes away.
    pub async fn next_key(&mut self) -> io::Result<Option<Key>> {
        let mut chunk = [0u8; INPUT_EVENT_SIZE * 8];
        loop {
            while self.pending.len() >= INPUT_EVENT_SIZE {
                let key = decode_event(&self.pending[..INPUT_EVENT_SIZE]);
                self.pending.drain(..INPUT_EVENT_SIZE);
                if key.is_some() {
                    return Ok(key);
                }
            }

            let mut guard = self.fd.readable().await?;
            match guard.try_io(|inner| inner.get_ref().read(&mut chunk)) {
                Ok(Ok(0)) => return Ok(None),
                Ok(Ok(n)) => self.pending.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {}
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => {}
            }
        }
    }
}

/// Find an input device whose name looks like a keypad.
pub fn detect_keypad() -> Option<PathBuf> {
    detect_in(Path::new("/sys/class/input"), Path::new("/dev/input"))
}

fn detect_in(sys_root: &Path, dev_root: &Path) -> Option<PathBuf> {
    let mut devices: Vec<(String, String)> = std::fs::read_dir(sys_root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let node = entry.file_name().to_string_lossy().into_owned();
            if !node.starts_with("event") {
                return None;
            }
            let name = std::fs::read_to_string(entry.path().join("device/name")).ok()?;
            Some((node, name.trim().to_lowercase()))
        })
        .collect();
    devices.sort();

    for keyword in DEVICE_KEYWORDS {
        if let Some((node, name)) = devices.iter().find(|(_, name)| name.contains(keyword)) {
            info!("auto-detected keypad {:?} at {}", name, node);
            return Some(dev_root.join(node));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_event(ev_type: u16, code: u16, value: i32) -> [u8; INPUT_EVENT_SIZE] {
        let mut buf = [0u8; INPUT_EVENT_SIZE];
        let n = INPUT_EVENT_SIZE;
        buf[n - 8..n - 6].copy_from_slice(&ev_type.to_ne_bytes());
        buf[n - 6..n - 4].copy_from_slice(&code.to_ne_bytes());
        buf[n - 4..].copy_from_slice(&value.to_ne_bytes());
        buf
    }

    #[test]
    fn test_keypad_codes() {
        assert_eq!(key_from_code(82), Some(Key::Digit(0)));
        assert_eq!(key_from_code(73), Some(Key::Digit(9)));
        assert_eq!(key_from_code(2), Some(Key::Digit(1)));
        assert_eq!(key_from_code(11), Some(Key::Digit(0)));
        assert_eq!(key_from_code(96), Some(Key::Enter));
        assert_eq!(key_from_code(14), Some(Key::Clear));
        assert_eq!(key_from_code(83), Some(Key::Clear));
        assert_eq!(key_from_code(30), None); // KEY_A
    }

    #[test]
    fn test_decode_only_key_down() {
        assert_eq!(decode_event(&raw_event(EV_KEY, 79, 1)), Some(Key::Digit(1)));
        assert_eq!(decode_event(&raw_event(EV_KEY, 79, 0)), None); // release
        assert_eq!(decode_event(&raw_event(EV_KEY, 79, 2)), None); // autorepeat
        assert_eq!(decode_event(&raw_event(0x04, 79, 1)), None); // EV_MSC
        assert_eq!(decode_event(&[0u8; 4]), None);
    }

    fn fifo(dir: &Path) -> PathBuf {
        let path = dir.join("event0");
        let c_path = std::ffi::CString::new(path.to_str().unwrap()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);
        path
    }

    #[tokio::test]
    async fn test_reads_events_from_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let path = fifo(dir.path());
        let mut pad = EvdevKeypad::open(&path, false).await.unwrap();

        let mut writer = OpenOptions::new().write(true).open(&path).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&raw_event(0x04, 4, 458_841));
        bytes.extend_from_slice(&raw_event(EV_KEY, 82, 1));
        bytes.extend_from_slice(&raw_event(EV_KEY, 82, 0));
        bytes.extend_from_slice(&raw_event(EV_KEY, 96, 1));
        std::io::Write::write_all(&mut writer, &bytes).unwrap();
        drop(writer);

        assert_eq!(pad.next_key().await.unwrap(), Some(Key::Digit(0)));
        assert_eq!(pad.next_key().await.unwrap(), Some(Key::Enter));
        assert_eq!(pad.next_key().await.unwrap(), None);
        assert_eq!(pad.path(), path.as_path());
    }

    #[test]
    fn test_idle_keypad_does_not_hold_runtime_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = fifo(dir.path());
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let mut pad = rt.block_on(EvdevKeypad::open(&path, false)).unwrap();
        // writer stays open and silent
        let _writer = OpenOptions::new().write(true).open(&path).unwrap();

        let shutdown = tokio_util::sync::CancellationToken::new();
        let reader = rt.spawn({
            let shutdown = shutdown.clone();
            async move {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    key = pad.next_key() => panic!("unexpected key {key:?}"),
                }
            }
        });
        rt.block_on(async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            shutdown.cancel();
            reader.await.unwrap();
        });

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            drop(rt);
            let _ = done_tx.send(());
        });
        assert!(
            done_rx.recv_timeout(std::time::Duration::from_secs(2)).is_ok(),
            "runtime shutdown waited on the keypad read"
        );
    }

    #[tokio::test]
    async fn test_open_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let err = EvdevKeypad::open(dir.path().join("event9"), false).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_detect_prefers_keypad_names() {
        let sys = tempfile::tempdir().unwrap();
        for (node, name) in [
            ("event0", "Power Button"),
            ("event1", "USB Keyboard"),
            ("event2", "SEMICO USB Numpad"),
        ] {
            let dir = sys.path().join(node).join("device");
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("name"), format!("{name}\n")).unwrap();
        }
        let found = detect_in(sys.path(), Path::new("/dev/input"));
        assert_eq!(found, Some(PathBuf::from("/dev/input/event2")));
    }

    #[test]
    fn test_detect_none() {
        let sys = tempfile::tempdir().unwrap();
        assert_eq!(detect_in(sys.path(), Path::new("/dev/input")), None);
    }
}
