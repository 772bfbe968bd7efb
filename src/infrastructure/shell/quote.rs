use std::path::Path;

/// 转义后放进双引号，可直接拼接到 `sh -c` 命令行中
pub fn shell_quote(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "\\`");
    format!("\"{}\"", escaped)
}

pub fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/opt/tools"), "\"/opt/tools\"");
        assert_eq!(shell_quote("/Volumes/JDK 7"), "\"/Volumes/JDK 7\"");
        assert_eq!(shell_quote("a\"b$c`d\\e"), "\"a\\\"b\\$c\\`d\\\\e\"");
    }

    #[test]
    fn test_single_quotes_are_left_alone() {
        assert_eq!(shell_quote("it's"), "\"it's\"");
    }
}
