// Remote paths are always absolute from the scope root.
pub fn normalize_remote_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Percent-encodes every segment of a remote path, keeping the separators.
pub fn encode_url_path(path: &str) -> String {
    normalize_remote_path(path)
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn get_parent_path(path: &str) -> String {
    if path == "/" {
        return "/".to_string();
    }

    let clean_path = path.trim_end_matches('/');

    if let Some(last_slash) = clean_path.rfind('/') {
        if last_slash == 0 {
            "/".to_string()
        } else {
            clean_path[..last_slash].to_string()
        }
    } else {
        "/".to_string()
    }
}

pub fn get_file_name(path: &str) -> String {
    if path == "/" {
        return "".to_string();
    }

    let clean_path = path.trim_end_matches('/');

    if let Some(last_slash) = clean_path.rfind('/') {
        clean_path[last_slash + 1..].to_string()
    } else {
        clean_path.to_string()
    }
}

pub fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" || parent.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

pub fn normalize_server_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_each_segment() {
        assert_eq!(encode_url_path("/"), "/");
        assert_eq!(encode_url_path("docs/my file.txt"), "/docs/my%20file.txt");
        assert_eq!(encode_url_path("/a#b/c?d"), "/a%23b/c%3Fd");
    }

    #[test]
    fn parent_and_name() {
        assert_eq!(get_parent_path("/docs/a.txt"), "/docs");
        assert_eq!(get_parent_path("/docs/"), "/");
        assert_eq!(get_parent_path("/"), "/");
        assert_eq!(get_file_name("/docs/a.txt"), "a.txt");
        assert_eq!(get_file_name("/docs/"), "docs");
        assert_eq!(get_file_name("/"), "");
    }

    #[test]
    fn joins_under_root_and_subdirs() {
        assert_eq!(join_path("/", "docs"), "/docs");
        assert_eq!(join_path("/docs/", "a.txt"), "/docs/a.txt");
    }

    #[test]
    fn server_urls_lose_trailing_slashes() {
        assert_eq!(
            normalize_server_url(" https://files.example.com// "),
            "https://files.example.com"
        );
    }
}
