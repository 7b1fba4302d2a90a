#![forbid(unsafe_code)]

//! Avatar drawing shared by the roster and the cell indicators.

use nbp_core::{ElementId, HostError, OverlayHost, RemoteUser};

/// Draw `user` into an avatar element: image when the user published one,
/// initials on the user color otherwise.
pub(crate) fn paint_avatar(
    host: &dyn OverlayHost,
    element: ElementId,
    user: &RemoteUser,
) -> Result<(), HostError> {
    host.set_style(element, "background-color", &user.color)?;
    match &user.avatar_url {
        Some(url) => {
            host.set_style(element, "background-image", &format!("url(\"{url}\")"))?;
            host.set_text(element, "")?;
        }
        None => {
            host.set_style(element, "background-image", "none")?;
            host.set_text(element, &user.initials)?;
        }
    }
    host.set_attribute(element, "title", &user.name)?;
    host.set_attribute(element, "data-client-id", &user.client_id.to_string())
}
