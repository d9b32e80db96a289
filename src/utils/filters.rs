//! Цифровые фильтры для обработки сигналов

use core::f32::consts::PI;

use heapless::Deque;
use nalgebra::Vector2;

/// Фильтр нижних частот первого порядка (RC-фильтр)
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    /// Коэффициент фильтра (0.0-1.0)
    alpha: f32,
    /// Текущее выходное значение
    output: f32,
    /// Флаг инициализации
    initialized: bool,
}

impl LowPassFilter {
    /// Создание нового фильтра
    ///
    /// # Параметры
    /// * `cutoff_freq_hz` - частота среза в Гц
    /// * `sample_rate_hz` - частота дискретизации в Гц
    pub fn new(cutoff_freq_hz: f32, sample_rate_hz: f32) -> Self {
        // alpha = dt / (RC + dt), где RC = 1 / (2 * pi * fc)
        let dt = 1.0 / sample_rate_hz;
        let rc = 1.0 / (2.0 * PI * cutoff_freq_hz);
        let alpha = dt / (rc + dt);

        Self {
            alpha: if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { 1.0 },
            output: 0.0,
            initialized: false,
        }
    }

    /// Фильтрация одного значения
    pub fn filter(&mut self, input: f32) -> f32 {
        if !self.initialized {
            // При первом вызове просто запоминаем значение
            self.output = input;
            self.initialized = true;
        } else {
            // y[n] = α * x[n] + (1 - α) * y[n-1]
            self.output = self.alpha * input + (1.0 - self.alpha) * self.output;
        }

        self.output
    }

    /// Получение текущего выходного значения без обновления
    pub fn get_output(&self) -> f32 {
        self.output
    }

    /// Сброс фильтра
    pub fn reset(&mut self) {
        self.output = 0.0;
        self.initialized = false;
    }
}

/// Взвешенное скользящее среднее 2D приращений
///
/// Кольцевой буфер фиксированной емкости `N` с логической длиной окна.
/// Вес отсчета линейно растет к новым: самый старый - 1, самый новый - `len`.
#[derive(Debug, Clone)]
pub struct WeightedWindow<const N: usize> {
    samples: Deque<Vector2<f32>, N>,
    window: usize,
}

impl<const N: usize> WeightedWindow<N> {
    /// Создание окна; длина ограничивается диапазоном [1, N]
    pub fn new(window: usize) -> Self {
        Self {
            samples: Deque::new(),
            window: window.clamp(1, N),
        }
    }

    /// Текущая длина окна
    pub fn window(&self) -> usize {
        self.window
    }

    /// Количество отсчетов в буфере
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Изменение длины окна
    ///
    /// При уменьшении отбрасываются только самые старые отсчеты,
    /// последние `min(len, new)` сохраняются.
    pub fn resize(&mut self, window: usize) {
        self.window = window.clamp(1, N);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
    }

    /// Добавление отсчета и вычисление взвешенного среднего
    pub fn push(&mut self, sample: Vector2<f32>) -> Vector2<f32> {
        while self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        // Место есть: длина строго меньше окна, а окно <= N
        let _ = self.samples.push_back(sample);
        self.average()
    }

    /// Взвешенное среднее текущего содержимого
    pub fn average(&self) -> Vector2<f32> {
        let mut sum = Vector2::zeros();
        let mut total_weight = 0.0;
        for (i, sample) in self.samples.iter().enumerate() {
            let weight = (i + 1) as f32;
            sum += sample * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            sum / total_weight
        } else {
            Vector2::zeros()
        }
    }

    /// Очистка буфера (длина окна сохраняется)
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vector2<f32> {
        Vector2::new(x, y)
    }

    #[test]
    fn test_low_pass_first_sample_passthrough() {
        let mut lpf = LowPassFilter::new(1.0, 25.0);
        assert_eq!(lpf.filter(10.0), 10.0);
        let next = lpf.filter(0.0);
        assert!(next > 0.0 && next < 10.0);
        lpf.reset();
        assert_eq!(lpf.get_output(), 0.0);
    }

    #[test]
    fn test_recent_samples_weigh_more() {
        let mut window: WeightedWindow<16> = WeightedWindow::new(3);
        window.push(v(0.0, 0.0));
        window.push(v(0.0, 0.0));
        let avg = window.push(v(6.0, -6.0));
        // веса 1, 2, 3 -> 6 * 3 / 6
        assert!((avg.x - 3.0).abs() < 1e-6);
        assert!((avg.y + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut window: WeightedWindow<16> = WeightedWindow::new(2);
        window.push(v(100.0, 0.0));
        window.push(v(1.0, 0.0));
        let avg = window.push(v(1.0, 0.0));
        assert_eq!(window.len(), 2);
        assert!((avg.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_resize_keeps_most_recent() {
        let mut window: WeightedWindow<16> = WeightedWindow::new(5);
        for i in 1..=5 {
            window.push(v(i as f32, 0.0));
        }
        window.resize(2);
        assert_eq!(window.len(), 2);
        // остались 4 и 5 с весами 1 и 2
        let avg = window.average();
        assert!((avg.x - (4.0 + 10.0) / 3.0).abs() < 1e-5);

        window.resize(10);
        assert_eq!(window.len(), 2);
        assert_eq!(window.window(), 10);
    }

    #[test]
    fn test_window_capped_at_capacity() {
        let mut window: WeightedWindow<4> = WeightedWindow::new(100);
        assert_eq!(window.window(), 4);
        for _ in 0..10 {
            window.push(v(1.0, 1.0));
        }
        assert_eq!(window.len(), 4);

        window.resize(0);
        assert_eq!(window.window(), 1);
    }

    #[test]
    fn test_empty_average_is_zero() {
        let window: WeightedWindow<8> = WeightedWindow::new(4);
        assert!(window.is_empty());
        assert_eq!(window.average(), Vector2::zeros());
    }
}
