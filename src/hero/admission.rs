use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::path::Path;

use super::model::{HeroError, MAX_HERO_IMAGES, MAX_UPLOAD_BYTES};

/// 待上传的文件
#[derive(Debug, Clone)]
pub struct UploadCandidate<'a> {
    pub file_name: &'a str,
    /// 客户端声明的 MIME 类型，没有时按文件名推断
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl UploadCandidate<'_> {
    pub fn mime(&self) -> Option<String> {
        self.content_type
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
            .or_else(|| {
                mime_guess::from_path(self.file_name)
                    .first()
                    .map(|m| m.essence_str().to_string())
            })
    }
}

/// 通过校验的上传
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub key: String,
    pub content_type: String,
    pub display_order: i32,
}

/// 类型和大小校验，不需要任何网络调用
pub fn check_file(candidate: &UploadCandidate) -> Result<String, HeroError> {
    let mime = candidate.mime().ok_or(HeroError::NotAnImage)?;
    if !mime.starts_with("image/") {
        return Err(HeroError::NotAnImage);
    }
    if candidate.data.len() > MAX_UPLOAD_BYTES {
        return Err(HeroError::TooLarge);
    }
    Ok(mime)
}

/// 数量校验，新图片排在末尾
pub fn check_capacity(current_count: usize) -> Result<i32, HeroError> {
    if current_count >= MAX_HERO_IMAGES {
        return Err(HeroError::CapacityReached);
    }
    Ok(current_count as i32)
}

pub fn admit(candidate: &UploadCandidate, current_count: usize) -> Result<Admission, HeroError> {
    let content_type = check_file(candidate)?;
    let display_order = check_capacity(current_count)?;
    Ok(Admission {
        key: storage_key(candidate.file_name, &content_type),
        content_type,
        display_order,
    })
}

/// `<毫秒时间戳>-<随机串>.<扩展名>`
pub fn storage_key(file_name: &str, content_type: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first())
                .map(|e| e.to_string())
        })
        .unwrap_or_else(|| "bin".to_string());
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate<'a>(name: &'a str, ct: Option<&'a str>, data: &'a [u8]) -> UploadCandidate<'a> {
        UploadCandidate {
            file_name: name,
            content_type: ct,
            data,
        }
    }

    #[test]
    fn accepts_image_and_appends_at_end() {
        let data = vec![0u8; 1024];
        let admission = admit(&candidate("Banner.JPG", Some("image/jpeg"), &data), 3).unwrap();
        assert_eq!(admission.display_order, 3);
        assert_eq!(admission.content_type, "image/jpeg");
        assert!(admission.key.ends_with(".jpg"));
    }

    #[test]
    fn rejects_declared_non_image() {
        let result = admit(&candidate("notes.png", Some("text/plain"), b"hello"), 0);
        assert!(matches!(result, Err(HeroError::NotAnImage)));
    }

    #[test]
    fn infers_type_from_name_when_undeclared() {
        assert!(admit(&candidate("hero.webp", None, b"RIFF"), 0).is_ok());
        assert!(matches!(
            admit(&candidate("readme.txt", None, b"hi"), 0),
            Err(HeroError::NotAnImage)
        ));
        assert!(matches!(
            admit(&candidate("blob", None, b"hi"), 0),
            Err(HeroError::NotAnImage)
        ));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let exact = vec![0u8; MAX_UPLOAD_BYTES];
        assert!(check_file(&candidate("a.png", Some("image/png"), &exact)).is_ok());

        let over = vec![0u8; MAX_UPLOAD_BYTES + 1];
        assert!(matches!(
            check_file(&candidate("a.png", Some("image/png"), &over)),
            Err(HeroError::TooLarge)
        ));
    }

    #[test]
    fn capacity_is_five() {
        assert_eq!(check_capacity(4).unwrap(), 4);
        assert!(matches!(check_capacity(5), Err(HeroError::CapacityReached)));
    }

    #[test]
    fn key_uses_mime_extension_when_name_has_none() {
        let key = storage_key("upload", "image/png");
        assert!(key.ends_with(".png"), "{}", key);
        let (stamp, rest) = key.split_once('-').unwrap();
        assert!(stamp.parse::<i64>().is_ok());
        assert_eq!(rest.len(), "0123456789.png".len());
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let c = candidate("a", Some("Image/PNG; charset=binary"), b"x");
        assert_eq!(c.mime().as_deref(), Some("image/png"));
    }
}
