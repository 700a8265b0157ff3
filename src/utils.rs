use chrono::{Local, NaiveDateTime, Timelike};

/// 自动时间戳使用的格式
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 当前本地时间，精确到秒
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// 首字母大写，其余字母小写
pub fn first_to_upper(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// 模型名转集合名：小写后加复数后缀
pub fn collection_name(model: &str) -> String {
    let lower = model.to_lowercase();
    if lower.ends_with('s') {
        return lower;
    }
    if let Some(stem) = lower.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    if lower.ends_with("ch") || lower.ends_with("sh") || lower.ends_with('x') || lower.ends_with('z') {
        return format!("{lower}es");
    }
    format!("{lower}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_first_letter_and_lowers_the_rest() {
        assert_eq!(first_to_upper("user"), "User");
        assert_eq!(first_to_upper("userInfo"), "Userinfo");
        assert_eq!(first_to_upper("ORDER"), "Order");
        assert_eq!(first_to_upper(""), "");
    }

    #[test]
    fn pluralizes_model_names() {
        assert_eq!(collection_name("User"), "users");
        assert_eq!(collection_name("Category"), "categories");
        assert_eq!(collection_name("Day"), "days");
        assert_eq!(collection_name("Box"), "boxes");
        assert_eq!(collection_name("News"), "news");
    }

    #[test]
    fn timestamps_have_no_fraction() {
        assert_eq!(now().nanosecond(), 0);
        assert_eq!(now().format(TIME_FORMAT).to_string().len(), "2024-01-01 00:00:00".len());
    }
}
