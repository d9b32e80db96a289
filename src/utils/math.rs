//! Математические функции и утилиты

/// Ограничение значения в заданных пределах
#[inline(always)]
pub fn constrain(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Очистка входной величины: не-число превращается в 0, затем ограничение
#[inline]
pub fn sanitize(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        constrain(value, min, max)
    } else {
        0.0
    }
}

/// Симметричная очистка: [-limit, limit]
#[inline]
pub fn sanitize_symmetric(value: f32, limit: f32) -> f32 {
    sanitize(value, -limit, limit)
}

/// Линейная интерполяция между двумя значениями
/// t: 0.0 = a, 1.0 = b
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * constrain(t, 0.0, 1.0)
}

/// Обратная линейная интерполяция - получение t из значения
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if libm::fabsf(b - a) < f32::EPSILON {
        0.0
    } else {
        constrain((value - a) / (b - a), 0.0, 1.0)
    }
}

/// Нормализация угла в градусах в диапазон [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let mut normalized = angle % 360.0;
    if normalized < 0.0 {
        normalized += 360.0;
    }
    // -1e-8 % 360 + 360 округляется до 360.0
    if normalized >= 360.0 {
        normalized = 0.0;
    }
    normalized
}

/// Квадратный корень с защитой от отрицательных значений
#[inline]
pub fn safe_sqrt(value: f32) -> f32 {
    if value <= 0.0 {
        0.0
    } else {
        libm::sqrtf(value)
    }
}

/// Вычисление длины 2D вектора
#[inline]
pub fn vector2_length(x: f32, y: f32) -> f32 {
    safe_sqrt(x * x + y * y)
}

// Модульные тесты
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constrain() {
        assert_eq!(constrain(5.0, 0.0, 10.0), 5.0);
        assert_eq!(constrain(-5.0, 0.0, 10.0), 0.0);
        assert_eq!(constrain(15.0, 0.0, 10.0), 10.0);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(f32::NAN, -1.0, 1.0), 0.0);
        assert_eq!(sanitize(f32::INFINITY, -1.0, 1.0), 0.0);
        assert_eq!(sanitize(5.0, -1.0, 1.0), 1.0);
        assert_eq!(sanitize_symmetric(-5.0, 2.0), -2.0);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(1.0, 2.0, 0.5), 1.5);
        assert_eq!(lerp(1.0, 2.0, 2.0), 2.0);
        assert_eq!(inverse_lerp(30.0, 50.0, 40.0), 0.5);
        assert_eq!(inverse_lerp(1.0, 1.0, 5.0), 0.0);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(450.0), 90.0);
        assert!(normalize_degrees(-1e-8) < 360.0);
    }
}
