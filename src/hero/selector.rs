use super::model::{HeroImage, HeroSettings, PLACEHOLDER_URL};

/// 按 display_order 升序，排序稳定，相同值保持原有（插入）顺序
pub fn sorted(images: &[HeroImage]) -> Vec<&HeroImage> {
    let mut ordered: Vec<&HeroImage> = images.iter().collect();
    ordered.sort_by_key(|img| img.display_order);
    ordered
}

/// 当前应展示的图片 URL
pub fn current_image<'a>(
    settings: &HeroSettings,
    images: &'a [HeroImage],
    rotation_index: usize,
) -> &'a str {
    let ordered = sorted(images);
    let Some(&first) = ordered.first() else {
        return PLACEHOLDER_URL;
    };

    if settings.rotation_enabled {
        let shown: &'a HeroImage = ordered[rotation_index % ordered.len()];
        return &shown.url;
    }

    // 轮播关闭时显示选中的图片；选中的图片已被删除则退回第一张
    let shown: &'a HeroImage = settings
        .active_image_id
        .as_deref()
        .and_then(|id| ordered.iter().copied().find(|img| img.id == id))
        .unwrap_or(first);
    &shown.url
}

/// 下一张的索引；不足两张时保持不变
pub fn advance(rotation_index: usize, image_count: usize) -> usize {
    if image_count <= 1 {
        return rotation_index;
    }
    (rotation_index + 1) % image_count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, order: i32) -> HeroImage {
        HeroImage {
            id: id.to_string(),
            url: format!("/media/hero-images/{}.jpg", id),
            display_order: order,
            created_at: None,
        }
    }

    fn rotating() -> HeroSettings {
        HeroSettings {
            rotation_enabled: true,
            ..HeroSettings::default()
        }
    }

    #[test]
    fn empty_set_shows_placeholder() {
        assert_eq!(current_image(&HeroSettings::default(), &[], 0), PLACEHOLDER_URL);
        assert_eq!(current_image(&rotating(), &[], 3), PLACEHOLDER_URL);
    }

    #[test]
    fn static_mode_shows_active_image() {
        let images = vec![image("a", 0), image("b", 1)];
        let settings = HeroSettings {
            active_image_id: Some("b".to_string()),
            ..HeroSettings::default()
        };
        assert_eq!(current_image(&settings, &images, 0), "/media/hero-images/b.jpg");
    }

    #[test]
    fn dangling_active_image_falls_back_to_lowest_order() {
        let images = vec![image("b", 1), image("a", 0)];
        let settings = HeroSettings {
            active_image_id: Some("deleted".to_string()),
            ..HeroSettings::default()
        };
        assert_eq!(current_image(&settings, &images, 0), "/media/hero-images/a.jpg");

        let unset = HeroSettings::default();
        assert_eq!(current_image(&unset, &images, 7), "/media/hero-images/a.jpg");
    }

    #[test]
    fn rotation_wraps_by_modulo_over_sorted_images() {
        let images = vec![image("z", 2), image("x", 0), image("y", 1)];
        assert_eq!(current_image(&rotating(), &images, 0), "/media/hero-images/x.jpg");
        // 4 mod 3 = 1
        assert_eq!(current_image(&rotating(), &images, 4), "/media/hero-images/y.jpg");
        assert_eq!(current_image(&rotating(), &images, 5), "/media/hero-images/z.jpg");
    }

    #[test]
    fn ties_keep_insertion_order() {
        let images = vec![image("first", 0), image("second", 0), image("third", 0)];
        let ids: Vec<&str> = sorted(&images).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn advance_cycles_and_is_noop_for_small_sets() {
        assert_eq!(advance(0, 2), 1);
        assert_eq!(advance(1, 2), 0);
        assert_eq!(advance(4, 5), 0);
        assert_eq!(advance(0, 1), 0);
        assert_eq!(advance(3, 0), 3);
    }
}
