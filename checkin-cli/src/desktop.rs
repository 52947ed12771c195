use checkin_core::error::{CheckinError, CheckinResult};
use checkin_core::notify::Notifier;
use notify_rust::Notification;

/// Native desktop notifications (libnotify, macOS Notification Center, toast).
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) -> CheckinResult<()> {
        Notification::new()
            .appname("checkin")
            .summary(title)
            .body(message)
            .show()
            .map(|_| ())
            .map_err(|e| CheckinError::Notify(e.to_string()))
    }
}
