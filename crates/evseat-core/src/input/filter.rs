// Evseat Input Layer - Device Filtering
// Decides which kernel devices the backend opens

/// Check if a device should be opened.
///
/// With explicit filter names only devices matching by node path or by
/// name are used. Without filters every device the seat can classify is
/// used; `usable` is false for nodes that report nothing the seat
/// understands (no keys, axes, touch or switches).
pub fn matches_device_filter(
    device_name: &str,
    device_path: &str,
    filter_names: &[String],
    usable: bool,
) -> bool {
    if !filter_names.is_empty() {
        return filter_names
            .iter()
            .any(|match_name| device_path == match_name || device_name == match_name);
    }

    usable
}
